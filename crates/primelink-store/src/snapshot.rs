//! # Snapshot Cell
//!
//! Typed access to the one `PersistedSyncState` stored under a well-known key.
//!
//! Reads never fail: an unreachable store, a missing key, or corrupt JSON all
//! read as the empty snapshot (`timestamp == 0`) and are logged.

use std::sync::Arc;

use primelink_core::PersistedSyncState;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::store::SnapshotStore;

/// A snapshot stored under a single key of a [`SnapshotStore`].
#[derive(Clone)]
pub struct SnapshotCell {
    store: Arc<dyn SnapshotStore>,
    key: String,
}

impl std::fmt::Debug for SnapshotCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCell")
            .field("backend", &self.store.backend_name())
            .field("key", &self.key)
            .finish()
    }
}

impl SnapshotCell {
    pub fn new(store: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        SnapshotCell {
            store,
            key: key.into(),
        }
    }

    /// The storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Loads the snapshot, degrading to empty on any failure.
    pub async fn load(&self) -> PersistedSyncState {
        let raw = match self.store.get_item(&self.key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Snapshot read failed, using empty state");
                return PersistedSyncState::empty();
            }
        };

        match raw.as_deref() {
            None => PersistedSyncState::empty(),
            Some(json) => PersistedSyncState::from_json(json).unwrap_or_else(|e| {
                warn!(key = %self.key, error = %e, "Corrupt snapshot, using empty state");
                PersistedSyncState::empty()
            }),
        }
    }

    /// Serializes and writes the snapshot, replacing the stored one.
    pub async fn save(&self, state: &PersistedSyncState) -> StoreResult<()> {
        let json = state.to_json()?;
        self.store.set_item(&self.key, &json).await?;
        debug!(key = %self.key, timestamp = state.timestamp, "Snapshot saved");
        Ok(())
    }
}
