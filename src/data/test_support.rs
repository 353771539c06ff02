//! In-memory subgraph stand-in for router tests

use crate::data::source::{PollSource, Resource, SourceError};
use crate::models::{Funding, GlobalStats, PageRequest, Poll, PollFilter};
use crate::preferences::DataSource;
use crate::subgraph::SubgraphError;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn poll(id: u64) -> Poll {
    Poll {
        id,
        question: format!("Question {}", id),
        options: vec!["Yes".to_string(), "No".to_string()],
        creator: Address::repeat_byte(0x11),
        is_active: true,
        end_time: DateTime::<Utc>::from_timestamp(1_900_000_000, 0).unwrap(),
        created_at: DateTime::<Utc>::from_timestamp(1_700_000_000 + id as i64, 0),
        total_funding: U256::ZERO,
        participant_count: 0,
        funding_token: None,
    }
}

pub struct FakeSubgraph {
    /// Newest first
    polls: Vec<Poll>,
    voted: Vec<u64>,
    failing: bool,
    calls: AtomicUsize,
}

impl FakeSubgraph {
    pub fn new(polls: Vec<Poll>) -> Self {
        Self {
            polls,
            voted: Vec::new(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn with_voted(mut self, poll_ids: Vec<u64>) -> Self {
        self.voted = poll_ids;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(SubgraphError::Unavailable.into());
        }
        Ok(())
    }
}

#[async_trait]
impl PollSource for FakeSubgraph {
    fn kind(&self) -> DataSource {
        DataSource::Subgraph
    }

    fn supports(&self, _resource: Resource) -> bool {
        true
    }

    async fn polls(&self, filter: &PollFilter, page: PageRequest) -> Result<Vec<Poll>, SourceError> {
        self.enter()?;
        Ok(self
            .polls
            .iter()
            .filter(|p| filter.is_active.map_or(true, |a| p.is_active == a))
            .filter(|p| filter.creator.map_or(true, |c| p.creator == c))
            .skip(page.skip)
            .take(page.first)
            .cloned()
            .collect())
    }

    async fn poll(&self, poll_id: u64) -> Result<Option<Poll>, SourceError> {
        self.enter()?;
        Ok(self.polls.iter().find(|p| p.id == poll_id).cloned())
    }

    async fn poll_fundings(&self, _poll_id: u64, _page: PageRequest) -> Result<Vec<Funding>, SourceError> {
        self.enter()?;
        Ok(Vec::new())
    }

    async fn voted_poll_ids(&self, _voter: &Address) -> Result<Vec<u64>, SourceError> {
        self.enter()?;
        Ok(self.voted.clone())
    }

    async fn global_stats(&self) -> Result<GlobalStats, SourceError> {
        self.enter()?;
        Ok(GlobalStats {
            total_polls: self.polls.len() as u64,
            ..GlobalStats::default()
        })
    }
}
