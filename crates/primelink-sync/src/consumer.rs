//! # Config Consumer
//!
//! The storefront side of the hub. Keeps a [`DocumentState`] in step with
//! admin configuration, live through the hub and eventually through
//! periodic reconciliation against the durable snapshot.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ConfigConsumer Lifecycle                           │
//! │                                                                         │
//! │  Uninitialized ──mount()──► Initialized ──────────► Listening          │
//! │                             snapshot applied        hub.listen()       │
//! │                             last_update = ts        reconcile timer    │
//! │                                                          │              │
//! │                                        unmount() / drop  │              │
//! │                                                          ▼              │
//! │                                                      Unmounted          │
//! │                                            unsubscribed, timer aborted  │
//! │                                                                         │
//! │  LIVE:       msg.storeTarget includes us ──► apply effect              │
//! │                                              last_update = msg.ts      │
//! │  RECONCILE:  every N s, snapshot.ts > last_update ──► apply snapshot   │
//! │                                              last_update = snapshot.ts │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `last_update` is assigned from each live message, not maxed. A late,
//! older broadcast therefore lowers it, and the next reconciliation restores
//! the newer snapshot.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use primelink_core::effects::{apply_message, apply_snapshot};
use primelink_core::{
    DocumentState, PersistedSyncState, Storefront, SyncMessage, SyncMessageType, DEFAULT_RECONCILE_SECS,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::hub::{ConfigSyncHub, Subscription};

/// Caller hook for messages of one type.
pub type UpdateCallback = Arc<dyn Fn(&SyncMessage) + Send + Sync>;

// =============================================================================
// Status
// =============================================================================

/// Where a consumer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerPhase {
    Uninitialized,
    Initialized,
    Listening,
    Unmounted,
}

impl std::fmt::Display for ConsumerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsumerPhase::Uninitialized => write!(f, "uninitialized"),
            ConsumerPhase::Initialized => write!(f, "initialized"),
            ConsumerPhase::Listening => write!(f, "listening"),
            ConsumerPhase::Unmounted => write!(f, "unmounted"),
        }
    }
}

/// Connection and freshness snapshot for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerStatus {
    pub phase: ConsumerPhase,
    pub is_connected: bool,
    /// Timestamp of the last applied message or snapshot (0 = nothing yet).
    pub last_update: i64,
}

// =============================================================================
// Shared State
// =============================================================================

struct ConsumerShared {
    storefront: Storefront,
    document: watch::Sender<DocumentState>,
    last_update: AtomicI64,
    phase: Mutex<ConsumerPhase>,
    callbacks: Vec<(SyncMessageType, UpdateCallback)>,
}

impl ConsumerShared {
    fn phase(&self) -> ConsumerPhase {
        self.phase.lock().map(|p| *p).unwrap_or(ConsumerPhase::Unmounted)
    }

    fn set_phase(&self, phase: ConsumerPhase) {
        if let Ok(mut p) = self.phase.lock() {
            *p = phase;
        }
        debug!(storefront = %self.storefront, %phase, "Consumer phase changed");
    }

    fn handle_message(&self, message: &SyncMessage) {
        if !message.is_for(self.storefront) {
            debug!(
                storefront = %self.storefront,
                target = %message.store_target,
                msg_type = %message.kind,
                "Ignoring message for another storefront"
            );
            return;
        }

        // last_update moves under the document lock so a concurrent
        // reconciliation sees the document and its timestamp together.
        self.document.send_if_modified(|doc| {
            let next = apply_message(doc.clone(), message);
            let changed = next != *doc;
            *doc = next;
            self.last_update.store(message.timestamp, Ordering::SeqCst);
            changed
        });

        for (kind, callback) in &self.callbacks {
            if *kind == message.kind {
                callback(message);
            }
        }

        debug!(
            storefront = %self.storefront,
            msg_type = %message.kind,
            timestamp = message.timestamp,
            "Applied live update"
        );
    }

    async fn reconcile(&self, hub: &ConfigSyncHub) -> bool {
        let snapshot = hub.get_persisted_state().await;
        self.apply_if_newer(&snapshot)
    }

    /// Applies `snapshot` if it is strictly newer than the last applied
    /// update. The comparison is repeated under the document lock, so a live
    /// message that lands after the storage read wins.
    fn apply_if_newer(&self, snapshot: &PersistedSyncState) -> bool {
        let mut previous = None;
        self.document.send_if_modified(|doc| {
            let last = self.last_update.load(Ordering::SeqCst);
            if !snapshot.is_newer_than(last) {
                return false;
            }
            previous = Some(last);
            let next = apply_snapshot(doc.clone(), snapshot, self.storefront);
            let changed = next != *doc;
            *doc = next;
            self.last_update.store(snapshot.timestamp, Ordering::SeqCst);
            changed
        });

        let Some(previous) = previous else {
            return false;
        };
        info!(
            storefront = %self.storefront,
            previous,
            timestamp = snapshot.timestamp,
            "Reconciled from snapshot"
        );
        true
    }
}

// =============================================================================
// Builder
// =============================================================================

/// A not-yet-mounted consumer.
///
/// ## Usage
/// ```rust,ignore
/// let consumer = ConfigConsumer::new(hub, Storefront::Tech)
///     .on_update(SyncMessageType::Banner, |msg| render_banner(&msg.payload))
///     .mount()
///     .await;
///
/// let doc = consumer.document();
/// ```
pub struct ConfigConsumer {
    hub: ConfigSyncHub,
    storefront: Storefront,
    reconcile_interval: Duration,
    initial_document: DocumentState,
    callbacks: Vec<(SyncMessageType, UpdateCallback)>,
}

impl ConfigConsumer {
    pub fn new(hub: ConfigSyncHub, storefront: Storefront) -> Self {
        ConfigConsumer {
            hub,
            storefront,
            reconcile_interval: Duration::from_secs(DEFAULT_RECONCILE_SECS),
            initial_document: DocumentState::default(),
            callbacks: Vec::new(),
        }
    }

    /// Storefront and reconcile interval from configuration.
    pub fn from_config(hub: ConfigSyncHub, config: &SyncConfig) -> Self {
        Self::new(hub, config.storefront()).reconcile_interval(config.reconcile_interval())
    }

    /// Sets the reconciliation period.
    pub fn reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// Starts from an existing document instead of an empty one.
    pub fn with_document(mut self, document: DocumentState) -> Self {
        self.initial_document = document;
        self
    }

    /// Registers a callback for live messages of `kind`.
    ///
    /// The only effect passthrough types (text, layout, animation, category,
    /// discount, banner) have. For the other types it runs after the
    /// built-in effect.
    pub fn on_update<F>(mut self, kind: SyncMessageType, callback: F) -> Self
    where
        F: Fn(&SyncMessage) + Send + Sync + 'static,
    {
        self.callbacks.push((kind, Arc::new(callback)));
        self
    }

    /// Always `Uninitialized` before mount.
    pub fn phase(&self) -> ConsumerPhase {
        ConsumerPhase::Uninitialized
    }

    /// Applies the stored snapshot, subscribes, and starts reconciliation.
    pub async fn mount(self) -> ConsumerHandle {
        let (document, _) = watch::channel(self.initial_document);
        let shared = Arc::new(ConsumerShared {
            storefront: self.storefront,
            document,
            last_update: AtomicI64::new(0),
            phase: Mutex::new(ConsumerPhase::Uninitialized),
            callbacks: self.callbacks,
        });
        let hub = self.hub;

        let snapshot = hub.get_persisted_state().await;
        shared
            .document
            .send_modify(|doc| *doc = apply_snapshot(std::mem::take(doc), &snapshot, shared.storefront));
        shared.last_update.store(snapshot.timestamp, Ordering::SeqCst);
        shared.set_phase(ConsumerPhase::Initialized);

        let listener = shared.clone();
        let subscription = hub.listen(move |message| listener.handle_message(message));

        let reconciler = tokio::spawn(reconcile_loop(shared.clone(), hub.clone(), self.reconcile_interval));
        shared.set_phase(ConsumerPhase::Listening);

        info!(
            storefront = %shared.storefront,
            connected = hub.is_connected(),
            snapshot_timestamp = snapshot.timestamp,
            interval_secs = self.reconcile_interval.as_secs(),
            "Consumer mounted"
        );

        ConsumerHandle {
            shared,
            hub,
            subscription: Some(subscription),
            reconciler: Some(reconciler),
        }
    }
}

async fn reconcile_loop(shared: Arc<ConsumerShared>, hub: ConfigSyncHub, period: Duration) {
    // interval_at panics on a zero period
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        shared.reconcile(&hub).await;
    }
}

// =============================================================================
// Mounted Consumer
// =============================================================================

/// A mounted consumer. Dropping it unmounts.
pub struct ConsumerHandle {
    shared: Arc<ConsumerShared>,
    hub: ConfigSyncHub,
    subscription: Option<Subscription>,
    reconciler: Option<JoinHandle<()>>,
}

impl ConsumerHandle {
    /// Current document.
    pub fn document(&self) -> DocumentState {
        self.shared.document.borrow().clone()
    }

    /// Change notifications for the document.
    pub fn watch_document(&self) -> watch::Receiver<DocumentState> {
        self.shared.document.subscribe()
    }

    pub fn storefront(&self) -> Storefront {
        self.shared.storefront
    }

    pub fn last_update(&self) -> i64 {
        self.shared.last_update.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ConsumerStatus {
        ConsumerStatus {
            phase: self.shared.phase(),
            is_connected: self.hub.is_connected(),
            last_update: self.last_update(),
        }
    }

    /// Runs one reconciliation pass now. Returns true if the snapshot was
    /// newer and got applied.
    pub async fn reconcile_now(&self) -> bool {
        if self.shared.phase() == ConsumerPhase::Unmounted {
            return false;
        }
        self.shared.reconcile(&self.hub).await
    }

    /// Unsubscribes and stops the reconciliation timer. Idempotent.
    pub fn unmount(&mut self) {
        if let Some(task) = self.reconciler.take() {
            task.abort();
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if self.shared.phase() != ConsumerPhase::Unmounted {
            self.shared.set_phase(ConsumerPhase::Unmounted);
            info!(storefront = %self.shared.storefront, "Consumer unmounted");
        }
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubOptions;
    use crate::protocol::Envelope;
    use crate::transport::{BroadcastTransport, LocalBus, Unavailable};
    use primelink_core::effects::{DESCRIPTION_META, PRIMARY_PROPERTY};
    use primelink_core::{ManualClock, MagicMode, StoreTarget};
    use primelink_store::{MemoryStore, SnapshotStore};
    use serde_json::json;
    use uuid::Uuid;

    struct Rig {
        bus: LocalBus,
        store: MemoryStore,
        clock: ManualClock,
        admin: ConfigSyncHub,
    }

    impl Rig {
        fn new() -> Self {
            let bus = LocalBus::new();
            let store = MemoryStore::new();
            let clock = ManualClock::new(1_000);
            let admin = ConfigSyncHub::with_options(
                Arc::new(store.clone()),
                Arc::new(bus.clone()),
                HubOptions::default().clock(Arc::new(clock.clone())),
            );
            Rig { bus, store, clock, admin }
        }

        fn shop_hub(&self) -> ConfigSyncHub {
            ConfigSyncHub::with_options(
                Arc::new(self.store.clone()),
                Arc::new(self.bus.clone()),
                HubOptions::default().clock(Arc::new(self.clock.clone())),
            )
        }

        async fn mount(&self, storefront: Storefront) -> ConsumerHandle {
            ConfigConsumer::new(self.shop_hub(), storefront).mount().await
        }
    }

    async fn wait_until<F>(consumer: &ConsumerHandle, check: F) -> DocumentState
    where
        F: Fn(&DocumentState) -> bool,
    {
        let mut rx = consumer.watch_document();
        let doc = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|doc| check(doc)))
            .await
            .expect("document update within timeout")
            .expect("document channel open")
            .clone();
        doc
    }

    #[tokio::test]
    async fn test_mount_applies_snapshot() {
        let rig = Rig::new();
        rig.admin.send(SyncMessageType::Theme, json!({ "primaryColor": "#123456" })).await;
        rig.clock.advance(10);
        rig.admin.send(SyncMessageType::MagicMode, json!({ "mode": "holiday" })).await;

        let consumer = rig.mount(Storefront::Lifestyle).await;
        let doc = consumer.document();

        assert_eq!(doc.style_property(PRIMARY_PROPERTY), Some("#123456"));
        assert_eq!(doc.magic_mode(), MagicMode::Holiday);
        assert_eq!(consumer.last_update(), 1_010);
        assert_eq!(
            consumer.status(),
            ConsumerStatus {
                phase: ConsumerPhase::Listening,
                is_connected: true,
                last_update: 1_010,
            }
        );
    }

    #[tokio::test]
    async fn test_theme_reaches_tech_consumer_and_storage() {
        let rig = Rig::new();
        let consumer = rig.mount(Storefront::Tech).await;

        rig.admin
            .send_to(SyncMessageType::Theme, json!({ "primaryColor": "#ff0000" }), StoreTarget::Both)
            .await;

        wait_until(&consumer, |doc| doc.style_property(PRIMARY_PROPERTY) == Some("#ff0000")).await;
        let snapshot = rig.admin.get_persisted_state().await;
        assert_eq!(snapshot.slot(SyncMessageType::Theme).unwrap()["primaryColor"], json!("#ff0000"));
        assert_eq!(consumer.last_update(), 1_000);
    }

    #[tokio::test]
    async fn test_audience_filtering() {
        let rig = Rig::new();
        let tech = rig.mount(Storefront::Tech).await;
        let lifestyle = rig.mount(Storefront::Lifestyle).await;

        rig.admin
            .send_to(SyncMessageType::Seo, json!({ "title": "Gadgets" }), StoreTarget::Tech)
            .await;
        rig.clock.advance(1);
        rig.admin
            .send_to(SyncMessageType::Localization, json!({ "language": "de" }), StoreTarget::Both)
            .await;

        let tech_doc = wait_until(&tech, |doc| doc.lang.as_deref() == Some("de")).await;
        let life_doc = wait_until(&lifestyle, |doc| doc.lang.as_deref() == Some("de")).await;

        assert_eq!(tech_doc.title.as_deref(), Some("Gadgets"));
        assert_eq!(life_doc.title, None);
    }

    #[tokio::test]
    async fn test_reconcile_skips_stale_or_equal_snapshots() {
        let rig = Rig::new();
        rig.admin.send(SyncMessageType::Seo, json!({ "title": "Stored" })).await;
        let consumer = rig.mount(Storefront::Tech).await;
        assert_eq!(consumer.last_update(), 1_000);

        // Equal timestamp: not applied
        assert!(!consumer.reconcile_now().await);

        // Older snapshot written behind our back: not applied
        let stale = PersistedSyncState {
            timestamp: 500,
            ..PersistedSyncState::empty().with_slot(SyncMessageType::Seo, json!({ "title": "Stale" }))
        };
        rig.store
            .set_item(primelink_core::DEFAULT_STORAGE_KEY, &stale.to_json().unwrap())
            .await
            .unwrap();
        assert!(!consumer.reconcile_now().await);
        assert_eq!(consumer.document().title.as_deref(), Some("Stored"));
        assert_eq!(consumer.last_update(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_respects_slot_audience() {
        let rig = Rig::new();
        let lifestyle = rig.mount(Storefront::Lifestyle).await;
        let tech = rig.mount(Storefront::Tech).await;

        rig.admin
            .send_to(SyncMessageType::Seo, json!({ "title": "Gadgets" }), StoreTarget::Tech)
            .await;
        wait_until(&tech, |doc| doc.title.as_deref() == Some("Gadgets")).await;
        assert_eq!(lifestyle.document().title, None);

        tokio::time::sleep(Duration::from_secs(DEFAULT_RECONCILE_SECS + 1)).await;

        assert_eq!(lifestyle.document().title, None);
        assert_eq!(lifestyle.last_update(), 1_000);

        // A late lifestyle mount also skips it
        let late = rig.mount(Storefront::Lifestyle).await;
        assert_eq!(late.document().title, None);
        let late_tech = rig.mount(Storefront::Tech).await;
        assert_eq!(late_tech.document().title.as_deref(), Some("Gadgets"));
    }

    #[tokio::test]
    async fn test_live_update_after_storage_read_wins() {
        let rig = Rig::new();
        let consumer = ConfigConsumer::new(rig.shop_hub(), Storefront::Tech)
            .reconcile_interval(Duration::from_secs(3600))
            .mount()
            .await;

        // A reconciliation read this snapshot, then a newer message arrived
        let read = PersistedSyncState {
            timestamp: 300,
            ..PersistedSyncState::empty().with_slot(SyncMessageType::Seo, json!({ "title": "Read" }))
        };
        let live = SyncMessage::new(SyncMessageType::Seo, json!({ "title": "Live" }), StoreTarget::Both, 400);
        consumer.shared.handle_message(&live);

        assert!(!consumer.shared.apply_if_newer(&read));
        assert_eq!(consumer.document().title.as_deref(), Some("Live"));
        assert_eq!(consumer.last_update(), 400);

        let newer = PersistedSyncState { timestamp: 500, ..read };
        assert!(consumer.shared.apply_if_newer(&newer));
        assert_eq!(consumer.document().title.as_deref(), Some("Read"));
        assert_eq!(consumer.last_update(), 500);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let rig = Rig::new();
        let consumer = ConfigConsumer::new(rig.shop_hub(), Storefront::Tech)
            .reconcile_interval(Duration::from_secs(3600))
            .mount()
            .await;

        // Written with broadcast unavailable, so only storage carries it
        let offline_admin = ConfigSyncHub::with_options(
            Arc::new(rig.store.clone()),
            Arc::new(Unavailable),
            HubOptions::default().clock(Arc::new(ManualClock::new(5_000))),
        );
        offline_admin.send(SyncMessageType::Seo, json!({ "description": "Quiet" })).await;

        assert!(consumer.reconcile_now().await);
        let once = consumer.document();
        assert!(!consumer.reconcile_now().await);
        assert_eq!(consumer.document(), once);
        assert_eq!(once.meta_content(DESCRIPTION_META), Some("Quiet"));
        assert_eq!(consumer.last_update(), 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_broadcasts_heal_on_reconcile() {
        let rig = Rig::new();
        let consumer = rig.mount(Storefront::Tech).await;

        // Storage sees A@100 then B@200
        let writer = ConfigSyncHub::with_options(
            Arc::new(rig.store.clone()),
            Arc::new(Unavailable),
            HubOptions::default().clock(Arc::new(ManualClock::new(100))),
        );
        writer.send(SyncMessageType::Seo, json!({ "title": "A" })).await;
        let writer = ConfigSyncHub::with_options(
            Arc::new(rig.store.clone()),
            Arc::new(Unavailable),
            HubOptions::default().clock(Arc::new(ManualClock::new(200))),
        );
        writer.send(SyncMessageType::Seo, json!({ "title": "B" })).await;

        // The live channel delivers B before A
        let sender = Uuid::new_v4();
        let b = SyncMessage::new(SyncMessageType::Seo, json!({ "title": "B" }), StoreTarget::Both, 200);
        let a = SyncMessage::new(SyncMessageType::Seo, json!({ "title": "A" }), StoreTarget::Both, 100);
        rig.bus.post(Envelope::new(sender, b)).unwrap();
        rig.bus.post(Envelope::new(sender, a)).unwrap();

        wait_until(&consumer, |doc| doc.title.as_deref() == Some("A")).await;
        assert_eq!(consumer.last_update(), 100);

        tokio::time::sleep(Duration::from_secs(DEFAULT_RECONCILE_SECS + 1)).await;

        assert_eq!(consumer.document().title.as_deref(), Some("B"));
        assert_eq!(consumer.last_update(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_only_propagation_without_broadcast() {
        let store = MemoryStore::new();
        let admin = ConfigSyncHub::with_options(
            Arc::new(store.clone()),
            Arc::new(Unavailable),
            HubOptions::default().clock(Arc::new(ManualClock::new(7_000))),
        );
        let shop = ConfigSyncHub::new(Arc::new(store), Arc::new(Unavailable));
        let consumer = ConfigConsumer::new(shop, Storefront::Lifestyle)
            .reconcile_interval(Duration::from_secs(2))
            .mount()
            .await;
        assert!(!consumer.status().is_connected);

        admin.send(SyncMessageType::MagicMode, json!({ "mode": "vibrant" })).await;
        assert_eq!(consumer.document().magic_mode(), MagicMode::Normal);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(consumer.document().magic_mode(), MagicMode::Vibrant);
        assert_eq!(consumer.last_update(), 7_000);
    }

    #[tokio::test]
    async fn test_passthrough_callbacks() {
        let rig = Rig::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let consumer = ConfigConsumer::new(rig.shop_hub(), Storefront::Tech)
            .on_update(SyncMessageType::Banner, move |msg| {
                let _ = tx.send(msg.payload.clone());
            })
            .mount()
            .await;
        let before = consumer.document();

        rig.admin.send(SyncMessageType::Banner, json!({ "text": "Free shipping" })).await;

        let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload["text"], json!("Free shipping"));
        assert_eq!(consumer.document(), before);
        assert_eq!(consumer.last_update(), 1_000);
    }

    #[tokio::test]
    async fn test_unmount_stops_everything() {
        let rig = Rig::new();
        let hub = rig.shop_hub();
        let mut consumer = ConfigConsumer::new(hub.clone(), Storefront::Tech).mount().await;
        assert_eq!(hub.listener_count(), 1);

        consumer.unmount();
        consumer.unmount();
        assert_eq!(consumer.status().phase, ConsumerPhase::Unmounted);
        assert_eq!(hub.listener_count(), 0);
        assert!(!consumer.reconcile_now().await);

        rig.admin.send(SyncMessageType::Seo, json!({ "title": "Late" })).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(consumer.document().title, None);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let rig = Rig::new();
        let hub = rig.shop_hub();
        {
            let _consumer = ConfigConsumer::new(hub.clone(), Storefront::Tech).mount().await;
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_from_config_and_initial_document() {
        let rig = Rig::new();
        let mut config = SyncConfig::default();
        config.storefront.identity = Storefront::Lifestyle;

        let mut existing = DocumentState::default();
        existing.body_classes.insert("dark".into());

        let consumer = ConfigConsumer::from_config(rig.shop_hub(), &config);
        assert_eq!(consumer.phase(), ConsumerPhase::Uninitialized);
        let consumer = consumer.with_document(existing).mount().await;

        assert_eq!(consumer.storefront(), Storefront::Lifestyle);
        assert!(consumer.document().has_body_class("dark"));
        assert_eq!(consumer.last_update(), 0);
    }
}
