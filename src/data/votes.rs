//! "Has voted" checks backed by the voted-polls cache

use crate::cache::{VotedPollsCache, VotedPollsEntry};
use crate::contract::PollsContract;
use crate::data::query::QueryError;
use crate::data::source::{PollSource, Resource, SourceError};
use crate::preferences::DataSource;
use alloy_primitives::Address;
use std::sync::Arc;

/// Answers whether an address voted on a poll.
///
/// A valid cache entry containing the poll answers `true` without a call.
/// Anything else is decided by the contract, and positive answers are
/// written back. Cache storage failures are logged and never fail a check.
pub struct VoteChecker {
    cache: VotedPollsCache,
    chain_id: u64,
    contract: Option<PollsContract>,
    subgraph: Option<Arc<dyn PollSource>>,
}

impl VoteChecker {
    pub fn new(cache: VotedPollsCache, chain_id: u64) -> Self {
        Self {
            cache,
            chain_id,
            contract: None,
            subgraph: None,
        }
    }

    pub fn with_contract(mut self, contract: PollsContract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Source used by [`refresh`](Self::refresh)
    pub fn with_subgraph(mut self, source: Arc<dyn PollSource>) -> Self {
        self.subgraph = Some(source);
        self
    }

    fn cache_key(voter: &Address) -> String {
        voter.to_string().to_lowercase()
    }

    pub async fn has_voted(&self, poll_id: u64, voter: Address) -> Result<bool, QueryError> {
        let key = Self::cache_key(&voter);

        match self.cache.read(&key, self.chain_id) {
            Ok(Some(entry)) if entry.is_valid() && entry.contains(poll_id) => {
                tracing::debug!(poll_id, voter = %key, "Vote found in cache");
                return Ok(true);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Voted-polls cache read failed"),
        }

        let contract = self
            .contract
            .as_ref()
            .ok_or(QueryError::NotConfigured(DataSource::Contract))?;

        let voted = contract
            .has_user_voted(poll_id, voter)
            .await
            .map_err(SourceError::from)?;

        if voted {
            if let Err(e) = self.cache.add(&key, self.chain_id, poll_id) {
                tracing::warn!(error = %e, "Failed to record vote in cache");
            }
        }
        Ok(voted)
    }

    /// Replace the cached entry with the full voted set from the subgraph
    pub async fn refresh(&self, voter: Address) -> Result<VotedPollsEntry, QueryError> {
        let source = self
            .subgraph
            .as_ref()
            .ok_or(QueryError::NotConfigured(DataSource::Subgraph))?;
        if !source.supports(Resource::VotedPolls) {
            return Err(SourceError::Unsupported(Resource::VotedPolls).into());
        }

        let ids = source.voted_poll_ids(&voter).await?;
        let key = Self::cache_key(&voter);

        match self.cache.write(&key, self.chain_id, ids.iter().copied()) {
            Ok(entry) => {
                tracing::debug!(voter = %key, count = entry.total_count, "Voted polls refreshed");
                Ok(entry)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store voted polls");
                let mut poll_ids = Vec::with_capacity(ids.len());
                for id in ids {
                    if !poll_ids.contains(&id) {
                        poll_ids.push(id);
                    }
                }
                Ok(VotedPollsEntry {
                    total_count: poll_ids.len(),
                    poll_ids,
                    last_fetched_at: chrono::Utc::now().timestamp_millis(),
                })
            }
        }
    }

    /// Cached entry for `voter`, valid or not
    pub fn cached(&self, voter: Address) -> Option<VotedPollsEntry> {
        self.cache
            .read(&Self::cache_key(&voter), self.chain_id)
            .ok()
            .flatten()
    }
}
