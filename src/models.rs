//! Normalized domain types
//!
//! These are the shapes every read path produces, whichever backing store
//! served them. Raw subgraph and contract representations are mapped into
//! these in their own modules.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A funded question that addresses vote on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: u64,
    pub question: String,
    pub options: Vec<String>,
    pub creator: Address,
    pub is_active: bool,
    pub end_time: DateTime<Utc>,
    /// Not exposed by the contract getter; subgraph only
    pub created_at: Option<DateTime<Utc>>,
    /// Total funding in the token's smallest unit
    pub total_funding: U256,
    /// Number of votes cast
    pub participant_count: u64,
    /// `None` for native ETH funding
    pub funding_token: Option<Address>,
}

impl Poll {
    /// Whether voting has closed at `now`, regardless of the active flag
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Active and still inside its voting window
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.has_ended(now)
    }
}

/// A funding event on a poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funding {
    pub id: String,
    pub poll_id: u64,
    pub token: Address,
    pub amount: U256,
    pub funder: Address,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: Option<String>,
}

/// A reward payment sent to a recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    pub poll_id: u64,
    pub recipient: Address,
    pub token: Address,
    pub amount: U256,
    pub timestamp: DateTime<Utc>,
    /// e.g. "distributed", "withdrawn", "claimed"
    pub event_type: String,
}

/// One entry in an address's claim history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub poll_id: u64,
    pub claimer: Address,
    pub token: Address,
    pub amount: U256,
    pub timestamp: DateTime<Utc>,
}

/// A single vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub poll_id: u64,
    pub voter: Address,
    pub option_index: u32,
    pub timestamp: DateTime<Utc>,
}

/// Platform-wide totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_polls: u64,
    pub total_votes: u64,
    pub total_funding: U256,
    pub total_distributed: U256,
    pub unique_voters: u64,
    pub unique_funders: u64,
}

/// Per-day activity bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub day_start: DateTime<Utc>,
    pub polls_created: u64,
    pub votes_cast: u64,
    pub funding_amount: U256,
}

/// Optional predicates for poll listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollFilter {
    pub is_active: Option<bool>,
    pub creator: Option<Address>,
}

impl PollFilter {
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            creator: None,
        }
    }

    pub fn by_creator(creator: Address) -> Self {
        Self {
            is_active: None,
            creator: Some(creator),
        }
    }
}

/// `first` / `skip` pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub first: usize,
    pub skip: usize,
}

impl PageRequest {
    pub fn new(first: usize, skip: usize) -> Self {
        Self { first, skip }
    }

    /// The page that follows this one
    pub fn next(&self) -> Self {
        Self {
            first: self.first,
            skip: self.skip + self.first,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { first: 20, skip: 0 }
    }
}

/// Convert an 18-decimal amount to a float for display
pub fn wei_to_eth(amount: U256) -> f64 {
    format_units(amount, 18)
}

/// Convert an amount with `decimals` to a float for display
pub fn format_units(amount: U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    // f64 parsing of the decimal string keeps precision for large values
    amount.to_string().parse::<f64>().unwrap_or(0.0) / divisor
}
