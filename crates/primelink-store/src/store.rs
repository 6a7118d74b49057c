//! # Snapshot Store Trait
//!
//! The storage seam the hub is built against. Think of it as one origin's
//! local storage: a flat string map shared by every context that holds a
//! handle to it.
//!
//! ## Backends
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SnapshotStore Backends                            │
//! │                                                                         │
//! │  MemoryStore                        │  SqliteStore                      │
//! │  ───────────                        │  ─────────────────                │
//! │  • Process-local HashMap            │  • kv_store table, WAL mode       │
//! │  • Clones share one map             │  • Survives process restarts      │
//! │  • shared() for configured hubs     │  • Shared by local processes      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

/// Durable string key/value storage.
///
/// All operations are read-merge-write friendly: no locking across calls, the
/// last `set_item` wins.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Reads the value under `key`, `None` if absent.
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// Short backend name (for logging).
    fn backend_name(&self) -> &'static str;
}

/// In-process storage. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store used by hubs built from configuration, so
    /// every such context reads the same snapshot.
    pub fn shared() -> MemoryStore {
        static SHARED: OnceLock<MemoryStore> = OnceLock::new();
        SHARED.get_or_init(MemoryStore::new).clone()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("memory store lock poisoned".into())
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut items = self.items.write().map_err(poisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        let mut items = self.items.write().map_err(poisoned)?;
        items.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("k").await.unwrap(), None);

        store.set_item("k", "v1").await.unwrap();
        store.set_item("k", "v2").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.remove_item("k").await.unwrap();
        store.remove_item("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.clone();
        tab_a.set_item("shared", "yes").await.unwrap();
        assert_eq!(tab_b.get_item("shared").await.unwrap().as_deref(), Some("yes"));
    }

    #[tokio::test]
    async fn test_shared_store_is_one_map() {
        MemoryStore::shared().set_item("store_shared_test", "1").await.unwrap();
        assert!(Arc::ptr_eq(&MemoryStore::shared().items, &MemoryStore::shared().items));
        assert_eq!(
            MemoryStore::shared().get_item("store_shared_test").await.unwrap().as_deref(),
            Some("1")
        );
        assert!(MemoryStore::new().get_item("store_shared_test").await.unwrap().is_none());
    }
}
