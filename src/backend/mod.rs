//! Backend REST Integration
//!
//! Client for the BasePulse REST API. Besides the endpoints only the
//! backend can answer (points, quests, feedback, swaps, gas), it serves as
//! the secondary source for global statistics when the subgraph fails.

mod client;
mod dto;

pub use client::BackendClient;
pub use dto::{
    AnalyticsStats, FeedbackReceipt, FeedbackRequest, GasPrice, LeaderboardEntry,
    ParticipantPoints, Quest, QuestClaim, SideShiftPair, SideShiftQuote, SideShiftQuoteRequest,
};

use crate::models::GlobalStats;
use async_trait::async_trait;
use thiserror::Error;

/// Aggregate statistics served outside the subgraph
#[async_trait]
pub trait StatsBackend: Send + Sync {
    async fn global_stats(&self) -> Result<GlobalStats, BackendError>;
}

/// Errors that can occur when calling the backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
