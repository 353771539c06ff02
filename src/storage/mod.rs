//! Durable Key-Value Storage
//!
//! The local equivalent of browser storage: a flat map of string keys to
//! string values that survives restarts. Preferences and caches each own a
//! disjoint key namespace (see [`keys`]).
//!
//! - **kv**: the [`KeyValueStore`] trait plus file-backed and in-memory stores
//! - **keys**: fixed key names and key builders
//! - **error**: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use basepulse::storage::{FileStore, KeyValueStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FileStore::open("./basepulse_data/store.json")?;
//!     store.set("basepulse:sidebar-collapsed", "true")?;
//!     assert_eq!(store.get("basepulse:sidebar-collapsed")?.as_deref(), Some("true"));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod keys;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
