//! Data Source Preference
//!
//! Which read path the router uses: the indexing subgraph or direct
//! contract calls. The configured default is served until [`hydrate`]
//! has read the persisted choice, so early reads never disagree with a
//! fresh install.
//!
//! [`hydrate`]: DataSourcePreference::hydrate

use crate::storage::{keys, KeyValueStore, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Backing store for reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Subgraph,
    Contract,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Subgraph => "subgraph",
            DataSource::Contract => "contract",
        }
    }

    /// The other source
    pub fn toggled(self) -> Self {
        match self {
            DataSource::Subgraph => DataSource::Contract,
            DataSource::Contract => DataSource::Subgraph,
        }
    }
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Subgraph
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized data source name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown data source '{0}' (expected 'subgraph' or 'contract')")]
pub struct ParseDataSourceError(pub String);

impl FromStr for DataSource {
    type Err = ParseDataSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subgraph" => Ok(DataSource::Subgraph),
            "contract" => Ok(DataSource::Contract),
            other => Err(ParseDataSourceError(other.to_string())),
        }
    }
}

/// Persisted data source choice
pub struct DataSourcePreference {
    store: Arc<dyn KeyValueStore>,
    default: DataSource,
    current: RwLock<DataSource>,
    hydrated: AtomicBool,
}

impl DataSourcePreference {
    /// Create the preference; serves `default` until hydrated
    pub fn new(store: Arc<dyn KeyValueStore>, default: DataSource) -> Self {
        Self {
            store,
            default,
            current: RwLock::new(default),
            hydrated: AtomicBool::new(false),
        }
    }

    /// Create and immediately read the stored value
    pub fn load(store: Arc<dyn KeyValueStore>, default: DataSource) -> Self {
        let pref = Self::new(store, default);
        pref.hydrate();
        pref
    }

    /// Read the persisted value once. Unreadable or unknown values leave
    /// the default in place.
    pub fn hydrate(&self) -> DataSource {
        let stored = match self.store.get(keys::DATA_SOURCE) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read data source preference");
                None
            }
        };

        let source = match stored.as_deref().map(str::parse::<DataSource>) {
            Some(Ok(source)) => source,
            Some(Err(e)) => {
                tracing::warn!(error = %e, default = %self.default, "Ignoring stored data source");
                self.default
            }
            None => self.default,
        };

        *self.write_guard() = source;
        self.hydrated.store(true, Ordering::Release);
        tracing::debug!(source = %source, "Data source preference hydrated");
        source
    }

    /// Whether storage has been read yet
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }

    /// Current preference
    pub fn get(&self) -> DataSource {
        *self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The configured default
    pub fn default_source(&self) -> DataSource {
        self.default
    }

    /// Update the preference and persist it
    pub fn set(&self, source: DataSource) -> StorageResult<()> {
        *self.write_guard() = source;
        tracing::info!(source = %source, "Data source preference changed");
        self.store.set(keys::DATA_SOURCE, source.as_str())
    }

    /// Flip between subgraph and contract; returns the new value
    pub fn toggle(&self) -> StorageResult<DataSource> {
        let next = {
            let mut current = self.write_guard();
            *current = current.toggled();
            *current
        };
        tracing::info!(source = %next, "Data source preference toggled");
        self.store.set(keys::DATA_SOURCE, next.as_str())?;
        Ok(next)
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, DataSource> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
