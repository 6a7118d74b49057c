//! Builds hubs from [`SyncConfig`].

use std::sync::Arc;

use primelink_store::{MemoryStore, SnapshotStore, SqliteStore, StoreConfig};
use tracing::info;

use crate::config::{StorageBackend, StorageSettings, SyncConfig, TransportKind, TransportSettings};
use crate::error::SyncResult;
use crate::hub::{ConfigSyncHub, HubOptions};
use crate::relay_client::{RelayClientConfig, RelayTransport};
use crate::transport::{BroadcastTransport, LocalBus, Unavailable};

/// Opens the configured storage backend. Memory backends share
/// [`MemoryStore::shared`], pairing with the shared local bus.
pub async fn build_store(settings: &StorageSettings) -> SyncResult<Arc<dyn SnapshotStore>> {
    match settings.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::shared())),
        StorageBackend::Sqlite => {
            let store = SqliteStore::new(StoreConfig::new(settings.path.clone())).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Creates the configured broadcast transport. Local transports share
/// [`LocalBus::shared`].
pub fn build_transport(settings: &TransportSettings) -> Arc<dyn BroadcastTransport> {
    match settings.kind {
        TransportKind::Local => Arc::new(LocalBus::shared()),
        TransportKind::Relay => Arc::new(RelayTransport::new(RelayClientConfig::from(settings))),
        TransportKind::None => Arc::new(Unavailable),
    }
}

/// Validates `config` and starts a hub from it.
pub async fn connect(config: &SyncConfig) -> SyncResult<ConfigSyncHub> {
    config.validate()?;

    let store = build_store(&config.storage).await?;
    let transport = build_transport(&config.transport);
    info!(
        transport = %config.transport.kind,
        backend = store.backend_name(),
        storage_key = config.storage_key(),
        "Connecting sync hub"
    );

    Ok(ConfigSyncHub::with_options(
        store,
        transport,
        HubOptions::default().storage_key(config.storage_key()),
    ))
}
