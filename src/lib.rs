//! # BasePulse
//!
//! Data layer for the PulsePoll/BasePulse polling and rewards platform.
//! Reads polls, fundings, distributions, claims and votes from either an
//! indexing subgraph or the polls contract itself, chosen by a persisted
//! user preference.
//!
//! ## Features
//!
//! - **Dual-source reads**: one router, two strategies, switchable at runtime
//! - **Uniform results**: data / loading / error / served-by for every read
//! - **Local caches**: voted polls with a 5 minute TTL, ETH/USD price
//! - **Backend client**: analytics, points, quests, feedback, swaps, gas
//!
//! ## Modules
//!
//! - [`data`]: the unified router and its source strategies
//! - [`subgraph`]: GraphQL access layer
//! - [`contract`]: direct contract reads over JSON-RPC
//! - [`backend`]: BasePulse REST API client
//! - [`preferences`]: data source and UI preferences
//! - [`cache`]: voted-polls and price caches
//! - [`storage`]: durable key-value storage
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use basepulse::{AppContext, Config};
//! use basepulse::models::{PageRequest, PollFilter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut ctx = AppContext::new(Config::load_default())?;
//!     ctx.start_price_refresh();
//!
//!     // Served by whichever source the user picked
//!     let polls = ctx.router.fetch_polls(&PollFilter::active(), PageRequest::default()).await;
//!     println!("{} active polls via {:?}", polls.data.len(), polls.served_by);
//!
//!     // Flip to direct contract reads; persisted for the next run
//!     ctx.preference.toggle()?;
//!
//!     ctx.shutdown();
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod backend;
pub mod cache;
pub mod config;
pub mod contract;
pub mod data;
pub mod models;
pub mod preferences;
pub mod price;
pub mod storage;
pub mod subgraph;

// Re-export top-level types for convenience
pub use app::{AppContext, AppError};
pub use config::Config;

pub use data::{
    FeedState, PollFeed, PollSource, PulseData, Query, QueryError, QueryResult, Resource,
    ServedBy, VoteChecker,
};

pub use models::{
    Claim, DailyStats, Distribution, Funding, GlobalStats, PageRequest, Poll, PollFilter, Vote,
};

pub use preferences::{DataSource, DataSourcePreference, UiPreferences};

pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult};
