//! Local Caches
//!
//! - **voted_polls**: per-(address, chain) voted poll ids, 5 minute TTL
//! - **price**: single-slot ETH/USD quote
//!
//! [`clear_local_caches`] is the explicit cache-clear utility: it drops
//! every voted-polls entry and the stored data source preference.

mod price;
mod voted_polls;

pub use price::{CachedPrice, PriceCache};
pub use voted_polls::{VotedPollsCache, VotedPollsEntry, VOTED_POLLS_TTL_MS};

use crate::storage::{keys, KeyValueStore, StorageResult};

/// What [`clear_local_caches`] removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearReport {
    pub voted_poll_entries: usize,
    pub data_source_cleared: bool,
}

/// Remove cached vote records and the data source preference
pub fn clear_local_caches(store: &std::sync::Arc<dyn KeyValueStore>) -> StorageResult<ClearReport> {
    let voted_poll_entries = VotedPollsCache::new(store.clone()).clear_all()?;

    let data_source_cleared = store.get(keys::DATA_SOURCE)?.is_some();
    store.remove(keys::DATA_SOURCE)?;

    tracing::info!(
        voted_poll_entries,
        data_source_cleared,
        "Cleared local caches"
    );

    Ok(ClearReport {
        voted_poll_entries,
        data_source_cleared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_clear_keeps_ui_flags() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(keys::DATA_SOURCE, "contract").unwrap();
        store.set(keys::SIDEBAR_COLLAPSED, "true").unwrap();
        VotedPollsCache::new(store.clone())
            .add_at("0x01", 8453, 1, 0)
            .unwrap();

        let report = clear_local_caches(&store).unwrap();
        assert_eq!(report.voted_poll_entries, 1);
        assert!(report.data_source_cleared);

        assert!(store.get(keys::DATA_SOURCE).unwrap().is_none());
        assert_eq!(store.get(keys::SIDEBAR_COLLAPSED).unwrap().as_deref(), Some("true"));
    }
}
