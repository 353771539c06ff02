//! Storage key names
//!
//! Every persisted value lives under the `basepulse:` prefix.

/// Data source preference. Bump the version suffix when the stored
/// representation changes so stale values are ignored.
pub const DATA_SOURCE: &str = "basepulse:data-source:v1";

/// Sidebar collapse flag ("true" / "false")
pub const SIDEBAR_COLLAPSED: &str = "basepulse:sidebar-collapsed";

/// Prefix for per-announcement dismissal flags
pub const ANNOUNCEMENT_DISMISSED_PREFIX: &str = "basepulse:announcement-dismissed:";

/// Prefix for per-(address, chain) voted-polls cache entries
pub const VOTED_POLLS_PREFIX: &str = "basepulse:voted-polls:";

/// Key for a dismissed announcement
pub fn announcement_dismissed(announcement_id: &str) -> String {
    format!("{}{}", ANNOUNCEMENT_DISMISSED_PREFIX, announcement_id)
}

/// Key for the voted-polls cache of `address` on `chain_id`.
///
/// Addresses are lowercased so checksummed and plain forms share an entry.
pub fn voted_polls(address: &str, chain_id: u64) -> String {
    format!("{}{}:{}", VOTED_POLLS_PREFIX, address.to_lowercase(), chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voted_polls_key_is_case_insensitive() {
        let a = voted_polls("0xABCDEF0000000000000000000000000000000001", 8453);
        let b = voted_polls("0xabcdef0000000000000000000000000000000001", 8453);
        assert_eq!(a, b);
        assert!(a.starts_with(VOTED_POLLS_PREFIX));
        assert!(a.ends_with(":8453"));
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let ann = announcement_dismissed("launch");
        assert!(!ann.starts_with(VOTED_POLLS_PREFIX));
        assert!(!DATA_SOURCE.starts_with(ANNOUNCEMENT_DISMISSED_PREFIX));
        assert_ne!(DATA_SOURCE, SIDEBAR_COLLAPSED);
    }
}
