//! Unified Data Router
//!
//! The read surface dashboards use. Each resource is fetched through
//! [`PulseData`], which reads the data source preference on every call and
//! dispatches to a [`PollSource`] strategy.
//!
//! ## Architecture
//!
//! - **source**: the [`PollSource`] trait, subgraph and contract strategies
//! - **query**: [`QueryResult`] and refetchable [`Query`] handles
//! - **router**: [`PulseData`], the single dispatch point
//! - **feed**: [`PollFeed`], paginated poll listings
//! - **votes**: [`VoteChecker`], cache-first "has voted" checks
//!
//! # Example
//!
//! ```rust,no_run
//! use basepulse::data::PulseData;
//! use basepulse::models::{PageRequest, PollFilter};
//!
//! async fn show(router: &PulseData) {
//!     let result = router.fetch_polls(&PollFilter::active(), PageRequest::default()).await;
//!     match result.error_message() {
//!         Some(message) => eprintln!("{}", message),
//!         None => println!("{} polls", result.data.len()),
//!     }
//! }
//! ```

mod feed;
mod query;
mod router;
mod source;
#[cfg(test)]
mod test_support;
mod votes;

pub use feed::{FeedState, PollFeed};
pub use query::{Query, QueryError, QueryResult, ServedBy};
pub use router::PulseData;
pub use source::{ContractSource, PollSource, Resource, SourceError, SubgraphSource};
pub use votes::VoteChecker;
