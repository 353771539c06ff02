//! Key-value stores
//!
//! [`FileStore`] keeps the whole map in memory and rewrites a single JSON
//! file on every mutation. [`MemoryStore`] is the non-durable variant used
//! in tests and for `--ephemeral` runs.

use crate::storage::error::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A flat string-to-string store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// All keys starting with `prefix`, in lexical order
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// JSON-file backed store
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = Self::load(&path)?;

        tracing::debug!(path = ?path, entries = entries.len(), "Opened key-value store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> StorageResult<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| StorageError::Corruption(format!("{}: {}", path.display(), e)))
    }

    /// Write the map to a sibling temp file, then rename over the original
    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
