//! Identifier encoding
//!
//! The indexer keys poll entities by the poll id as a 32-byte word, so
//! numeric ids are zero-padded before they are used in a query.

use alloy_primitives::{hex, B256, U256};

/// `7` -> `0x0000…0007` (66 chars, lowercase)
pub fn to_bytes32_hex(id: u64) -> String {
    hex::encode_prefixed(B256::from(U256::from(id)))
}

/// Parse a poll id from either its bytes32 hex form or a decimal string
pub fn parse_poll_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let value: U256 = if raw.starts_with("0x") || raw.starts_with("0X") {
        U256::from_str_radix(&raw[2..], 16).ok()?
    } else {
        U256::from_str_radix(raw, 10).ok()?
    };
    u64::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes32_padding() {
        let hex = to_bytes32_hex(7);
        assert_eq!(hex.len(), 66);
        assert!(hex.starts_with("0x"));
        assert!(hex.ends_with("07"));
        assert_eq!(&hex[2..64], "0".repeat(62));

        assert_eq!(
            to_bytes32_hex(255),
            "0x00000000000000000000000000000000000000000000000000000000000000ff"
        );
    }

    #[test]
    fn test_parse_poll_id() {
        assert_eq!(parse_poll_id(&to_bytes32_hex(42)), Some(42));
        assert_eq!(parse_poll_id("42"), Some(42));
        assert_eq!(parse_poll_id("0x2a"), Some(42));
        assert_eq!(parse_poll_id("poll-1"), None);
        // larger than u64
        assert_eq!(parse_poll_id("0x10000000000000000"), None);
    }
}
