//! Voted-Polls Cache
//!
//! Per `(address, chain)` record of poll ids the address is known to have
//! voted on. It only short-circuits positive "has voted" answers; a miss
//! always falls through to a contract read.
//!
//! Ids are never evicted one at a time. An entry is replaced by [`write`],
//! grown by [`add`], or removed entirely by [`clear`] / [`clear_all`].
//! Validity is checked lazily by callers through
//! [`VotedPollsEntry::is_valid_at`].
//!
//! [`write`]: VotedPollsCache::write
//! [`add`]: VotedPollsCache::add
//! [`clear`]: VotedPollsCache::clear
//! [`clear_all`]: VotedPollsCache::clear_all

use crate::storage::{keys, KeyValueStore, StorageResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How long a fetched entry is trusted (5 minutes)
pub const VOTED_POLLS_TTL_MS: i64 = 5 * 60 * 1000;

/// Stored cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotedPollsEntry {
    /// Insertion order, no duplicates
    pub poll_ids: Vec<u64>,
    /// Milliseconds since epoch of the last full fetch
    pub last_fetched_at: i64,
    pub total_count: usize,
}

impl VotedPollsEntry {
    fn new(last_fetched_at: i64) -> Self {
        Self {
            poll_ids: Vec::new(),
            last_fetched_at,
            total_count: 0,
        }
    }

    pub fn contains(&self, poll_id: u64) -> bool {
        self.poll_ids.contains(&poll_id)
    }

    /// Valid while strictly less than the TTL has elapsed
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms - self.last_fetched_at < VOTED_POLLS_TTL_MS
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now().timestamp_millis())
    }

    /// Returns true when the id was not yet present
    fn insert(&mut self, poll_id: u64) -> bool {
        if self.contains(poll_id) {
            return false;
        }
        self.poll_ids.push(poll_id);
        self.total_count = self.poll_ids.len();
        true
    }
}

/// Storage-backed voted-polls cache
#[derive(Clone)]
pub struct VotedPollsCache {
    store: Arc<dyn KeyValueStore>,
}

impl VotedPollsCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the entry for `(address, chain_id)`. An unparseable entry is
    /// treated as absent.
    pub fn read(&self, address: &str, chain_id: u64) -> StorageResult<Option<VotedPollsEntry>> {
        let key = keys::voted_polls(address, chain_id);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable voted-polls entry");
                Ok(None)
            }
        }
    }

    /// Replace the entry with a freshly fetched id set
    pub fn write(
        &self,
        address: &str,
        chain_id: u64,
        poll_ids: impl IntoIterator<Item = u64>,
    ) -> StorageResult<VotedPollsEntry> {
        self.write_at(address, chain_id, poll_ids, Utc::now().timestamp_millis())
    }

    pub fn write_at(
        &self,
        address: &str,
        chain_id: u64,
        poll_ids: impl IntoIterator<Item = u64>,
        now_ms: i64,
    ) -> StorageResult<VotedPollsEntry> {
        let mut entry = VotedPollsEntry::new(now_ms);
        for id in poll_ids {
            entry.insert(id);
        }
        self.persist(address, chain_id, &entry)?;
        Ok(entry)
    }

    /// Record one vote. Idempotent: a known id leaves the entry unchanged.
    pub fn add(&self, address: &str, chain_id: u64, poll_id: u64) -> StorageResult<VotedPollsEntry> {
        self.add_at(address, chain_id, poll_id, Utc::now().timestamp_millis())
    }

    pub fn add_at(
        &self,
        address: &str,
        chain_id: u64,
        poll_id: u64,
        now_ms: i64,
    ) -> StorageResult<VotedPollsEntry> {
        let mut entry = self
            .read(address, chain_id)?
            .unwrap_or_else(|| VotedPollsEntry::new(now_ms));

        if entry.insert(poll_id) {
            self.persist(address, chain_id, &entry)?;
        }
        Ok(entry)
    }

    /// Drop the entry for one `(address, chain_id)`
    pub fn clear(&self, address: &str, chain_id: u64) -> StorageResult<()> {
        self.store.remove(&keys::voted_polls(address, chain_id))
    }

    /// Drop every voted-polls entry; returns how many were removed
    pub fn clear_all(&self) -> StorageResult<usize> {
        let keys = self.store.keys_with_prefix(keys::VOTED_POLLS_PREFIX)?;
        for key in &keys {
            self.store.remove(key)?;
        }
        Ok(keys.len())
    }

    fn persist(&self, address: &str, chain_id: u64, entry: &VotedPollsEntry) -> StorageResult<()> {
        let raw = serde_json::to_string(entry)?;
        self.store.set(&keys::voted_polls(address, chain_id), &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const ALICE: &str = "0xA11cE00000000000000000000000000000000001";
    const BASE: u64 = 8453;

    fn cache() -> VotedPollsCache {
        VotedPollsCache::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_add_is_idempotent() {
        let cache = cache();
        cache.add_at(ALICE, BASE, 7, 1_000).unwrap();
        let entry = cache.add_at(ALICE, BASE, 7, 2_000).unwrap();

        assert_eq!(entry.poll_ids, vec![7]);
        assert_eq!(entry.total_count, 1);

        let entry = cache.add_at(ALICE, BASE, 9, 3_000).unwrap();
        assert_eq!(entry.poll_ids, vec![7, 9]);
        assert_eq!(entry.total_count, 2);
        // adding keeps the original fetch time
        assert_eq!(entry.last_fetched_at, 1_000);
    }

    #[test]
    fn test_validity_boundary() {
        let entry = VotedPollsEntry::new(10_000);
        assert!(entry.is_valid_at(10_000));
        assert!(entry.is_valid_at(10_000 + VOTED_POLLS_TTL_MS - 1));
        assert!(!entry.is_valid_at(10_000 + VOTED_POLLS_TTL_MS));
        assert!(!entry.is_valid_at(10_000 + VOTED_POLLS_TTL_MS + 1));
    }

    #[test]
    fn test_write_replaces_and_dedups() {
        let cache = cache();
        cache.add_at(ALICE, BASE, 1, 0).unwrap();

        let entry = cache.write_at(ALICE, BASE, vec![3, 2, 3, 5], 50).unwrap();
        assert_eq!(entry.poll_ids, vec![3, 2, 5]);
        assert_eq!(entry.total_count, 3);
        assert_eq!(entry.last_fetched_at, 50);

        let read = cache.read(ALICE, BASE).unwrap().unwrap();
        assert_eq!(read, entry);
    }

    #[test]
    fn test_entries_are_scoped_by_address_and_chain() {
        let cache = cache();
        cache.add_at(ALICE, BASE, 1, 0).unwrap();

        assert!(cache.read(&ALICE.to_lowercase(), BASE).unwrap().is_some());
        assert!(cache.read(ALICE, 84532).unwrap().is_none());
        assert!(cache
            .read("0x0000000000000000000000000000000000000002", BASE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_clear_all() {
        let cache = cache();
        cache.add_at(ALICE, BASE, 1, 0).unwrap();
        cache.add_at(ALICE, 84532, 1, 0).unwrap();

        assert_eq!(cache.clear_all().unwrap(), 2);
        assert!(cache.read(ALICE, BASE).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_reads_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(&keys::voted_polls(ALICE, BASE), "{not json").unwrap();

        let cache = VotedPollsCache::new(store);
        assert!(cache.read(ALICE, BASE).unwrap().is_none());
        let entry = cache.add_at(ALICE, BASE, 4, 0).unwrap();
        assert_eq!(entry.poll_ids, vec![4]);
    }
}
