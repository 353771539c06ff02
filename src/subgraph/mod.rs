//! Subgraph Access Layer
//!
//! Reads indexed on-chain events through the BasePulse subgraph.
//!
//! ## Architecture
//!
//! - **client**: GraphQL-over-HTTP client, endpoint selection by chain id
//! - **queries**: query documents and `where` / paging variables
//! - **types**: raw entities and their mapping to [`crate::models`]
//! - **pagination**: `first` / `skip` window state for "load more"
//! - **ids**: bytes32 encoding of poll ids
//! - **voters**: first-vote-wins voter dedup

mod client;
mod ids;
mod pagination;
mod queries;
mod types;
mod voters;

pub use client::{SubgraphClient, SubgraphError};
pub use ids::{parse_poll_id, to_bytes32_hex};
pub use pagination::{PageTicket, Paginator};
pub use voters::{dedup_voters, merge_voters, unique_voters};
