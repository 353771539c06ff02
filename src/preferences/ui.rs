//! UI flags
//!
//! Small persisted switches the dashboards read: the sidebar collapse
//! state and which announcements the user has dismissed.

use crate::storage::{keys, KeyValueStore, StorageResult};
use std::sync::Arc;

/// Persisted UI flags
#[derive(Clone)]
pub struct UiPreferences {
    store: Arc<dyn KeyValueStore>,
}

impl UiPreferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Sidebar collapse flag; expanded when never set
    pub fn sidebar_collapsed(&self) -> StorageResult<bool> {
        Ok(self.store.get(keys::SIDEBAR_COLLAPSED)?.as_deref() == Some("true"))
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> StorageResult<()> {
        self.store
            .set(keys::SIDEBAR_COLLAPSED, if collapsed { "true" } else { "false" })
    }

    /// Flip the sidebar flag; returns the new value
    pub fn toggle_sidebar(&self) -> StorageResult<bool> {
        let next = !self.sidebar_collapsed()?;
        self.set_sidebar_collapsed(next)?;
        Ok(next)
    }

    pub fn is_announcement_dismissed(&self, announcement_id: &str) -> StorageResult<bool> {
        Ok(self
            .store
            .get(&keys::announcement_dismissed(announcement_id))?
            .is_some())
    }

    pub fn dismiss_announcement(&self, announcement_id: &str) -> StorageResult<()> {
        self.store
            .set(&keys::announcement_dismissed(announcement_id), "true")
    }
}
