//! Subgraph GraphQL Client
//!
//! HTTP client for the indexer's GraphQL endpoint. The endpoint is chosen
//! by chain id; chains without one fall back to the default network.

use crate::config::SubgraphConfig;
use crate::models::{
    Claim, DailyStats, Distribution, Funding, GlobalStats, PageRequest, Poll, PollFilter, Vote,
};
use crate::subgraph::ids::to_bytes32_hex;
use crate::subgraph::queries;
use crate::subgraph::types::{
    map_all, ClaimsData, DailyStatsData, DistributionsData, FundingsData, GlobalStatsData,
    PollData, PollsData, VoteRefsData, VotesData,
};
use alloy_primitives::Address;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Upper bound for "all votes of an address" lookups
const MAX_VOTER_VOTES: usize = 1000;

/// Subgraph GraphQL client
pub struct SubgraphClient {
    client: Client,
    endpoint: String,
    chain_id: u64,
}

impl SubgraphClient {
    /// Create a client for `chain_id`
    pub fn new(config: &SubgraphConfig, chain_id: u64) -> Result<Self, SubgraphError> {
        let (resolved_chain, endpoint) = Self::resolve_endpoint(config, chain_id)?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            chain_id: resolved_chain,
        })
    }

    /// Pick the endpoint for `chain_id`, falling back to the default network
    pub fn resolve_endpoint(
        config: &SubgraphConfig,
        chain_id: u64,
    ) -> Result<(u64, String), SubgraphError> {
        let find = |id: u64| {
            config
                .endpoints
                .iter()
                .find(|e| e.chain_id == id)
                .map(|e| e.url.clone())
        };

        if let Some(url) = find(chain_id) {
            return Ok((chain_id, url));
        }

        tracing::warn!(
            chain_id,
            default_chain_id = config.default_chain_id,
            "No subgraph for chain, falling back to default network"
        );

        find(config.default_chain_id)
            .map(|url| (config.default_chain_id, url))
            .ok_or(SubgraphError::NoEndpoint(chain_id))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Chain the endpoint actually indexes
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Run a query and return its `data` payload
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, SubgraphError> {
        let body = GraphQlRequest { query, variables };

        tracing::debug!(endpoint = %self.endpoint, "Subgraph query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubgraphError::Timeout
                } else if e.is_connect() {
                    SubgraphError::Unavailable
                } else {
                    SubgraphError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SubgraphError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let envelope: GraphQlResponse<T> = response.json().await?;
        envelope.into_result()
    }

    /// Polls, newest first
    pub async fn polls(
        &self,
        filter: &PollFilter,
        page: PageRequest,
    ) -> Result<Vec<Poll>, SubgraphError> {
        let mut variables = queries::page_variables(page);
        variables.insert("where".to_string(), queries::poll_filter(filter));

        let data: PollsData = self
            .query(&queries::polls_query(), Value::Object(variables))
            .await?;
        map_all(data.polls)
    }

    /// A single poll by numeric id
    pub async fn poll(&self, poll_id: u64) -> Result<Option<Poll>, SubgraphError> {
        let data: PollData = self
            .query(&queries::poll_query(), json!({ "id": to_bytes32_hex(poll_id) }))
            .await?;
        data.poll.map(Poll::try_from).transpose()
    }

    pub async fn poll_fundings(
        &self,
        poll_id: u64,
        page: PageRequest,
    ) -> Result<Vec<Funding>, SubgraphError> {
        let data: FundingsData = self
            .query(queries::FUNDINGS_QUERY, Self::poll_page_variables(poll_id, page))
            .await?;
        map_all(data.fundings)
    }

    pub async fn poll_distributions(
        &self,
        poll_id: u64,
        page: PageRequest,
    ) -> Result<Vec<Distribution>, SubgraphError> {
        let data: DistributionsData = self
            .query(
                queries::DISTRIBUTIONS_QUERY,
                Self::poll_page_variables(poll_id, page),
            )
            .await?;
        map_all(data.distributions)
    }

    /// Votes on a poll, oldest first
    pub async fn poll_votes(
        &self,
        poll_id: u64,
        page: PageRequest,
    ) -> Result<Vec<Vote>, SubgraphError> {
        let data: VotesData = self
            .query(queries::POLL_VOTES_QUERY, Self::poll_page_variables(poll_id, page))
            .await?;
        map_all(data.votes)
    }

    pub async fn claim_history(
        &self,
        claimer: &Address,
        page: PageRequest,
    ) -> Result<Vec<Claim>, SubgraphError> {
        let mut variables = queries::page_variables(page);
        variables.insert(
            "claimer".to_string(),
            Value::String(claimer.to_string().to_lowercase()),
        );

        let data: ClaimsData = self
            .query(queries::CLAIMS_QUERY, Value::Object(variables))
            .await?;
        map_all(data.claims)
    }

    /// Distinct ids of polls `voter` has voted on
    pub async fn voted_poll_ids(&self, voter: &Address) -> Result<Vec<u64>, SubgraphError> {
        let mut variables = queries::page_variables(PageRequest::new(MAX_VOTER_VOTES, 0));
        variables.insert(
            "voter".to_string(),
            Value::String(voter.to_string().to_lowercase()),
        );

        let data: VoteRefsData = self
            .query(queries::VOTER_VOTES_QUERY, Value::Object(variables))
            .await?;

        let mut ids = Vec::with_capacity(data.votes.len());
        for vote in data.votes {
            let id: u64 = vote.poll.poll_id.parse().map_err(|_| SubgraphError::Mapping {
                field: "poll.pollId",
                value: vote.poll.poll_id.clone(),
            })?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Platform totals; zeroed before the first indexed event
    pub async fn global_stats(&self) -> Result<GlobalStats, SubgraphError> {
        let data: GlobalStatsData = self.query(queries::GLOBAL_STATS_QUERY, json!({})).await?;
        match data.global_stats {
            Some(raw) => GlobalStats::try_from(raw),
            None => Ok(GlobalStats::default()),
        }
    }

    /// The most recent `days` daily buckets, newest first
    pub async fn daily_stats(&self, days: usize) -> Result<Vec<DailyStats>, SubgraphError> {
        let data: DailyStatsData = self
            .query(queries::DAILY_STATS_QUERY, json!({ "first": days }))
            .await?;
        map_all(data.daily_stats)
    }

    fn poll_page_variables(poll_id: u64, page: PageRequest) -> Value {
        let mut variables = queries::page_variables(page);
        variables.insert("poll".to_string(), Value::String(to_bytes32_hex(poll_id)));
        Value::Object(variables)
    }
}

// ============================================
// GraphQL envelope
// ============================================

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

impl<T> GraphQlResponse<T> {
    fn into_result(self) -> Result<T, SubgraphError> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(SubgraphError::GraphQl(messages.join("; ")));
        }
        self.data.ok_or(SubgraphError::MissingData)
    }
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when querying the subgraph
#[derive(Error, Debug)]
pub enum SubgraphError {
    #[error("No subgraph endpoint configured for chain {0}")]
    NoEndpoint(u64),

    #[error("Subgraph unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Subgraph HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Subgraph response had no data")]
    MissingData,

    #[error("Invalid value for {field}: {value}")]
    Mapping { field: &'static str, value: String },
}
