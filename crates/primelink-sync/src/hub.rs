//! # Config Sync Hub
//!
//! One per application context. Publishes configuration changes to the other
//! contexts and keeps the durable snapshot current, so that a context which
//! missed a broadcast can catch up from storage.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ConfigSyncHub                                    │
//! │                                                                         │
//! │  send(type, payload, target)                                           │
//! │       │                                                                 │
//! │       ├──► SyncMessage { timestamp = now }                             │
//! │       │         │                                                       │
//! │       │         └──► transport.post(Envelope{origin, message})         │
//! │       │                 (failure logged, never surfaced)               │
//! │       │                                                                 │
//! │       └──► snapshot = load; snapshot[type] = payload;                  │
//! │            snapshot.timestamp = now; save                              │
//! │                                                                         │
//! │  pump task                                                             │
//! │       transport rx ──► drop own origin ──► listeners, in order         │
//! │                                                                         │
//! │  Broadcast capability missing at construction                          │
//! │       ──► is_connected() == false, storage keeps working               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot is read-merge-write with no locking across contexts. Two
//! admins writing at once can lose one update; the later write wins.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use primelink_core::{
    Clock, PersistedSyncState, StoreTarget, SyncMessage, SyncMessageType, SystemClock, DEFAULT_STORAGE_KEY,
};
use primelink_store::{SnapshotCell, SnapshotStore};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::protocol::{ContextId, Envelope};
use crate::transport::BroadcastTransport;

/// A message handler registered with [`ConfigSyncHub::listen`].
pub type Listener = Arc<dyn Fn(&SyncMessage) + Send + Sync>;

// =============================================================================
// Options
// =============================================================================

/// Construction options for a hub.
#[derive(Clone)]
pub struct HubOptions {
    /// Key the snapshot lives under.
    pub storage_key: String,
    /// Timestamp source.
    pub clock: Arc<dyn Clock>,
}

impl Default for HubOptions {
    fn default() -> Self {
        HubOptions {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl HubOptions {
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

// =============================================================================
// Hub
// =============================================================================

struct HubInner {
    origin: ContextId,
    cell: SnapshotCell,
    transport: Arc<dyn BroadcastTransport>,
    clock: Arc<dyn Clock>,
    connected: AtomicBool,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl HubInner {
    fn dispatch(&self, message: &SyncMessage) {
        // Snapshot the registry so handlers may (un)subscribe re-entrantly.
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(guard) => guard.iter().map(|(_, listener)| listener.clone()).collect(),
            Err(_) => {
                warn!("Listener registry poisoned, dropping message");
                return;
            }
        };

        debug!(
            msg_type = %message.kind,
            target = %message.store_target,
            listeners = listeners.len(),
            "Dispatching message"
        );

        for listener in listeners {
            listener(message);
        }
    }

    fn remove_listener(&self, id: u64) {
        if let Ok(mut guard) = self.listeners.lock() {
            guard.retain(|(listener_id, _)| *listener_id != id);
        }
    }

    fn stop(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Ok(mut pump) = self.pump.lock() {
            if let Some(task) = pump.take() {
                task.abort();
            }
        }
        self.transport.close();
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cross-context configuration sync service.
///
/// Cheap to clone; clones share listeners and the transport. The hub shuts
/// down when [`shutdown`](Self::shutdown) is called or the last clone drops.
///
/// ## Usage
/// ```rust,ignore
/// let bus = LocalBus::new();
/// let store = Arc::new(MemoryStore::new());
///
/// let admin = ConfigSyncHub::new(store.clone(), Arc::new(bus.clone()));
/// let shop = ConfigSyncHub::new(store, Arc::new(bus));
///
/// let _sub = shop.listen(|msg| println!("{}", msg.kind));
/// admin.send(SyncMessageType::Theme, json!({ "primaryColor": "#ff0000" })).await;
/// ```
#[derive(Clone)]
pub struct ConfigSyncHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for ConfigSyncHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSyncHub")
            .field("origin", &self.inner.origin)
            .field("transport", &self.inner.transport.name())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl ConfigSyncHub {
    /// Creates a hub with the default storage key and the system clock.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(store: Arc<dyn SnapshotStore>, transport: Arc<dyn BroadcastTransport>) -> Self {
        Self::with_options(store, transport, HubOptions::default())
    }

    /// Creates a hub with explicit options.
    pub fn with_options(
        store: Arc<dyn SnapshotStore>,
        transport: Arc<dyn BroadcastTransport>,
        options: HubOptions,
    ) -> Self {
        let origin = Uuid::new_v4();
        let opened = transport.open();

        let inner = Arc::new(HubInner {
            origin,
            cell: SnapshotCell::new(store, options.storage_key),
            transport,
            clock: options.clock,
            connected: AtomicBool::new(opened.is_ok()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
            pump: Mutex::new(None),
        });

        match opened {
            Ok(rx) => {
                let task = tokio::spawn(pump(Arc::downgrade(&inner), rx, origin));
                if let Ok(mut slot) = inner.pump.lock() {
                    *slot = Some(task);
                }
                info!(
                    %origin,
                    transport = inner.transport.name(),
                    backend = inner.cell.store().backend_name(),
                    "Sync hub started"
                );
            }
            Err(e) if e.is_capability_error() => {
                warn!(
                    %origin,
                    transport = inner.transport.name(),
                    error = %e,
                    "Broadcast unavailable, falling back to storage-only sync"
                );
            }
            Err(e) => {
                error!(
                    %origin,
                    transport = inner.transport.name(),
                    error = %e,
                    "Broadcast transport failed to open, falling back to storage-only sync"
                );
            }
        }

        ConfigSyncHub { inner }
    }

    /// This context's origin ID.
    pub fn origin(&self) -> ContextId {
        self.inner.origin
    }

    /// The storage key the snapshot lives under.
    pub fn storage_key(&self) -> &str {
        self.inner.cell.key()
    }

    /// Sends an update to both storefronts.
    pub async fn send(&self, kind: SyncMessageType, payload: Value) {
        self.send_to(kind, payload, StoreTarget::Both).await;
    }

    /// Broadcasts an update to the other contexts and merges it into the
    /// durable snapshot.
    ///
    /// One timestamp stamps both the message and the snapshot. Neither a
    /// broadcast failure nor a storage failure is surfaced.
    pub async fn send_to(&self, kind: SyncMessageType, payload: Value, target: StoreTarget) {
        let now = self.inner.clock.now_millis();
        let message = SyncMessage::new(kind, payload, target, now);

        if self.is_connected() {
            let envelope = Envelope::new(self.inner.origin, message.clone());
            if let Err(e) = self.inner.transport.post(envelope) {
                warn!(msg_type = %kind, error = %e, "Broadcast failed, update stays in storage only");
            }
        } else {
            debug!(msg_type = %kind, "No broadcast capability, storing only");
        }

        let mut snapshot = self.inner.cell.load().await;
        snapshot.merge_message(&message);
        if let Err(e) = self.inner.cell.save(&snapshot).await {
            warn!(msg_type = %kind, error = %e, "Failed to persist update");
        }

        debug!(msg_type = %kind, %target, timestamp = now, "Update sent");
    }

    /// Registers `handler` for every message from other contexts.
    ///
    /// Own sends are never delivered back. Handlers run on the hub's receive
    /// task, in registration order, and must not block.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn listen<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SyncMessage) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        match self.inner.listeners.lock() {
            Ok(mut guard) => guard.push((id, Arc::new(handler))),
            Err(_) => warn!("Listener registry poisoned, handler not registered"),
        }
        debug!(listener = id, "Listener registered");

        Subscription {
            hub: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Reads the durable snapshot. Absent or unreadable storage reads as the
    /// empty snapshot.
    pub async fn get_persisted_state(&self) -> PersistedSyncState {
        self.inner.cell.load().await
    }

    /// Merges the present slots of `partial` into the durable snapshot and
    /// bumps its timestamp to now.
    pub async fn set_persisted_state(&self, partial: &PersistedSyncState) {
        let now = self.inner.clock.now_millis();
        let mut snapshot = self.inner.cell.load().await;
        snapshot.merge_partial(partial, now);
        if let Err(e) = self.inner.cell.save(&snapshot).await {
            warn!(error = %e, "Failed to persist snapshot");
        }
    }

    /// Whether the broadcast channel opened. A capability flag, not peer
    /// liveness.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Stops receiving and drops every listener. Storage operations keep
    /// working; `is_connected()` reports false afterwards.
    pub fn shutdown(&self) {
        self.inner.stop();
        if let Ok(mut guard) = self.inner.listeners.lock() {
            guard.clear();
        }
        info!(origin = %self.inner.origin, "Sync hub shut down");
    }
}

/// Receives envelopes and fans them out to the listeners.
async fn pump(hub: Weak<HubInner>, mut rx: mpsc::Receiver<Envelope>, origin: ContextId) {
    while let Some(envelope) = rx.recv().await {
        if envelope.is_from(origin) {
            continue;
        }
        let Some(inner) = hub.upgrade() else {
            break;
        };
        inner.dispatch(&envelope.message);
    }
    debug!(%origin, "Hub receive loop ended");
}

// =============================================================================
// Subscription
// =============================================================================

/// Handle to a registered listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    hub: Weak<HubInner>,
    id: Option<u64>,
}

impl Subscription {
    /// Removes the handler. Later calls are no-ops.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(hub) = self.hub.upgrade() {
                hub.remove_listener(id);
                debug!(listener = id, "Listener removed");
            }
        }
    }

    /// True until `unsubscribe` runs.
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
