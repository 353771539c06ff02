//! Read strategies
//!
//! [`PollSource`] is the seam between the router and a backing store.
//! Every method has a default that answers [`SourceError::Unsupported`];
//! each store overrides what it can serve and reports it via
//! [`PollSource::supports`].

use crate::contract::{ContractError, PollsContract};
use crate::models::{
    Claim, DailyStats, Distribution, Funding, GlobalStats, PageRequest, Poll, PollFilter, Vote,
};
use crate::preferences::DataSource;
use crate::subgraph::{dedup_voters, SubgraphClient, SubgraphError};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Resources the router can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Polls,
    Poll,
    PollsByCreator,
    PollsByStatus,
    PollFundings,
    PollDistributions,
    PollVoters,
    ClaimHistory,
    VotedPolls,
    GlobalStats,
    DailyStats,
}

impl Resource {
    /// Human-readable name used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Polls => "Polls",
            Resource::Poll => "Poll details",
            Resource::PollsByCreator => "Polls by creator",
            Resource::PollsByStatus => "Polls by status",
            Resource::PollFundings => "Funding history",
            Resource::PollDistributions => "Distribution history",
            Resource::PollVoters => "Voter list",
            Resource::ClaimHistory => "Claim history",
            Resource::VotedPolls => "Voted polls",
            Resource::GlobalStats => "Global statistics",
            Resource::DailyStats => "Daily statistics",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A backing store the router can dispatch to
#[async_trait]
pub trait PollSource: Send + Sync {
    fn kind(&self) -> DataSource;

    fn supports(&self, resource: Resource) -> bool;

    async fn polls(&self, filter: &PollFilter, page: PageRequest) -> Result<Vec<Poll>, SourceError>;

    async fn poll(&self, poll_id: u64) -> Result<Option<Poll>, SourceError>;

    async fn poll_fundings(&self, _poll_id: u64, _page: PageRequest) -> Result<Vec<Funding>, SourceError> {
        Err(SourceError::Unsupported(Resource::PollFundings))
    }

    async fn poll_distributions(
        &self,
        _poll_id: u64,
        _page: PageRequest,
    ) -> Result<Vec<Distribution>, SourceError> {
        Err(SourceError::Unsupported(Resource::PollDistributions))
    }

    /// Votes on a poll, one per voter within the requested page. A voter
    /// can appear again on a later page; merge pages with
    /// [`crate::subgraph::merge_voters`].
    async fn poll_voters(&self, _poll_id: u64, _page: PageRequest) -> Result<Vec<Vote>, SourceError> {
        Err(SourceError::Unsupported(Resource::PollVoters))
    }

    async fn claim_history(&self, _claimer: &Address, _page: PageRequest) -> Result<Vec<Claim>, SourceError> {
        Err(SourceError::Unsupported(Resource::ClaimHistory))
    }

    async fn voted_poll_ids(&self, _voter: &Address) -> Result<Vec<u64>, SourceError> {
        Err(SourceError::Unsupported(Resource::VotedPolls))
    }

    async fn global_stats(&self) -> Result<GlobalStats, SourceError> {
        Err(SourceError::Unsupported(Resource::GlobalStats))
    }

    async fn daily_stats(&self, _days: usize) -> Result<Vec<DailyStats>, SourceError> {
        Err(SourceError::Unsupported(Resource::DailyStats))
    }
}

/// Errors from a [`PollSource`]
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{0} is only available with subgraph data source")]
    Unsupported(Resource),

    #[error(transparent)]
    Subgraph(#[from] SubgraphError),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

// ============================================
// Subgraph
// ============================================

/// Serves every resource from the indexer
pub struct SubgraphSource {
    client: Arc<SubgraphClient>,
}

impl SubgraphSource {
    pub fn new(client: Arc<SubgraphClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<SubgraphClient> {
        &self.client
    }
}

#[async_trait]
impl PollSource for SubgraphSource {
    fn kind(&self) -> DataSource {
        DataSource::Subgraph
    }

    fn supports(&self, _resource: Resource) -> bool {
        true
    }

    async fn polls(&self, filter: &PollFilter, page: PageRequest) -> Result<Vec<Poll>, SourceError> {
        Ok(self.client.polls(filter, page).await?)
    }

    async fn poll(&self, poll_id: u64) -> Result<Option<Poll>, SourceError> {
        Ok(self.client.poll(poll_id).await?)
    }

    async fn poll_fundings(&self, poll_id: u64, page: PageRequest) -> Result<Vec<Funding>, SourceError> {
        Ok(self.client.poll_fundings(poll_id, page).await?)
    }

    async fn poll_distributions(
        &self,
        poll_id: u64,
        page: PageRequest,
    ) -> Result<Vec<Distribution>, SourceError> {
        Ok(self.client.poll_distributions(poll_id, page).await?)
    }

    async fn poll_voters(&self, poll_id: u64, page: PageRequest) -> Result<Vec<Vote>, SourceError> {
        let votes = self.client.poll_votes(poll_id, page).await?;
        Ok(dedup_voters(&votes))
    }

    async fn claim_history(&self, claimer: &Address, page: PageRequest) -> Result<Vec<Claim>, SourceError> {
        Ok(self.client.claim_history(claimer, page).await?)
    }

    async fn voted_poll_ids(&self, voter: &Address) -> Result<Vec<u64>, SourceError> {
        Ok(self.client.voted_poll_ids(voter).await?)
    }

    async fn global_stats(&self) -> Result<GlobalStats, SourceError> {
        Ok(self.client.global_stats().await?)
    }

    async fn daily_stats(&self, days: usize) -> Result<Vec<DailyStats>, SourceError> {
        Ok(self.client.daily_stats(days).await?)
    }
}

// ============================================
// Contract
// ============================================

/// Serves point lookups straight from the polls contract
pub struct ContractSource {
    contract: PollsContract,
    expected_chain: Option<u64>,
    chain_checked: OnceCell<()>,
}

impl ContractSource {
    pub fn new(contract: PollsContract) -> Self {
        Self {
            contract,
            expected_chain: None,
            chain_checked: OnceCell::new(),
        }
    }

    /// Refuse to read until the provider reports `chain_id`
    pub fn verify_chain(mut self, chain_id: u64) -> Self {
        self.expected_chain = Some(chain_id);
        self
    }

    pub fn contract(&self) -> &PollsContract {
        &self.contract
    }

    async fn ensure_chain(&self) -> Result<(), ContractError> {
        let Some(expected) = self.expected_chain else {
            return Ok(());
        };

        self.chain_checked
            .get_or_try_init(|| async {
                let actual = self.contract.provider().chain_id().await?;
                if actual != expected {
                    return Err(ContractError::WrongChain { expected, actual });
                }
                Ok(())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PollSource for ContractSource {
    fn kind(&self) -> DataSource {
        DataSource::Contract
    }

    fn supports(&self, resource: Resource) -> bool {
        matches!(resource, Resource::Polls | Resource::Poll)
    }

    /// Newest first over the id range. Filtered listings are refused.
    async fn polls(&self, filter: &PollFilter, page: PageRequest) -> Result<Vec<Poll>, SourceError> {
        if filter.creator.is_some() {
            return Err(SourceError::Unsupported(Resource::PollsByCreator));
        }
        if filter.is_active.is_some() {
            return Err(SourceError::Unsupported(Resource::PollsByStatus));
        }
        self.ensure_chain().await?;

        Ok(self.contract.polls(page).await?)
    }

    async fn poll(&self, poll_id: u64) -> Result<Option<Poll>, SourceError> {
        self.ensure_chain().await?;
        Ok(self.contract.poll(poll_id).await?)
    }
}
