//! User Preferences
//!
//! Explicit state containers over the key-value store. Each one is
//! constructed with the store it persists to and passed to whoever needs it.

mod data_source;
mod ui;

pub use data_source::{DataSource, DataSourcePreference, ParseDataSourceError};
pub use ui::UiPreferences;
