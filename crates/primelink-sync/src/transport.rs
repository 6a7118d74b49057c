//! # Broadcast Transports
//!
//! The seam between a hub and whatever carries envelopes to the other
//! contexts.
//!
//! ## Transport Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       BroadcastTransport                                │
//! │                                                                         │
//! │  open()  ──► Ok(Receiver<Envelope>)   capability present               │
//! │          ──► Err(SyncError)           capability absent                │
//! │                                       (hub reports is_connected=false) │
//! │                                                                         │
//! │  post(envelope)   fire-and-forget, no delivery guarantee               │
//! │  close()          stop background work, idempotent                     │
//! │                                                                         │
//! │  Transports MAY echo a context's own envelopes back to it; the hub     │
//! │  drops anything whose origin is its own.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Implementations
//! - [`LocalBus`] - in-process `tokio::sync::broadcast` channel
//! - [`RelayTransport`](crate::relay_client::RelayTransport) - WebSocket client to a relay server
//! - [`Unavailable`] - no broadcast capability at all

use std::sync::OnceLock;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::protocol::Envelope;

/// Capacity of the per-subscriber inbound queue.
pub(crate) const INBOUND_CAPACITY: usize = 256;

/// Capacity of the in-process broadcast ring.
const BUS_CAPACITY: usize = 1024;

/// Carries envelopes between application contexts.
pub trait BroadcastTransport: Send + Sync {
    /// Starts receiving. Called once per hub.
    fn open(&self) -> SyncResult<mpsc::Receiver<Envelope>>;

    /// Publishes an envelope to every other context.
    fn post(&self, envelope: Envelope) -> SyncResult<()>;

    /// Stops any background work.
    fn close(&self) {}

    /// Short transport name (for logging).
    fn name(&self) -> &'static str;
}

// =============================================================================
// Local Bus
// =============================================================================

/// In-process broadcast bus. Clones publish to and receive from the same
/// channel, like tabs of one origin.
#[derive(Debug, Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<Envelope>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        LocalBus { tx }
    }

    /// The process-wide bus used by hubs built from configuration.
    pub fn shared() -> LocalBus {
        static SHARED: OnceLock<LocalBus> = OnceLock::new();
        SHARED.get_or_init(LocalBus::new).clone()
    }

    /// Number of open receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl BroadcastTransport for LocalBus {
    fn open(&self) -> SyncResult<mpsc::Receiver<Envelope>> {
        let mut bus_rx = self.tx.subscribe();
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = bus_rx.recv() => match received {
                        Ok(envelope) => {
                            if tx.send(envelope).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Local bus receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tx.closed() => break,
                }
            }
            debug!("Local bus forwarder stopped");
        });

        Ok(rx)
    }

    fn post(&self, envelope: Envelope) -> SyncResult<()> {
        // No receivers is not an error: nobody else is listening yet.
        let _ = self.tx.send(envelope);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

// =============================================================================
// Unavailable
// =============================================================================

/// A transport for environments without broadcast capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl BroadcastTransport for Unavailable {
    fn open(&self) -> SyncResult<mpsc::Receiver<Envelope>> {
        Err(SyncError::BroadcastUnavailable("no broadcast transport configured".into()))
    }

    fn post(&self, _envelope: Envelope) -> SyncResult<()> {
        Err(SyncError::BroadcastUnavailable("no broadcast transport configured".into()))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primelink_core::{StoreTarget, SyncMessage, SyncMessageType};
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn envelope(title: &str) -> Envelope {
        Envelope::new(
            Uuid::new_v4(),
            SyncMessage::new(SyncMessageType::Seo, json!({ "title": title }), StoreTarget::Both, 1),
        )
    }

    #[tokio::test]
    async fn test_local_bus_delivers_to_every_receiver() {
        let bus = LocalBus::new();
        let mut a = bus.open().unwrap();
        let mut b = bus.clone().open().unwrap();

        bus.post(envelope("hello")).unwrap();

        let got_a = tokio::time::timeout(Duration::from_secs(1), a.recv()).await.unwrap().unwrap();
        let got_b = tokio::time::timeout(Duration::from_secs(1), b.recv()).await.unwrap().unwrap();
        assert_eq!(got_a, got_b);
        assert_eq!(got_a.message.payload["title"], json!("hello"));
    }

    #[tokio::test]
    async fn test_local_bus_post_without_receivers() {
        let bus = LocalBus::new();
        assert!(bus.post(envelope("nobody")).is_ok());
    }

    #[tokio::test]
    async fn test_local_bus_preserves_sender_order() {
        let bus = LocalBus::new();
        let mut rx = bus.open().unwrap();
        for i in 0..5 {
            bus.post(envelope(&i.to_string())).unwrap();
        }
        for i in 0..5 {
            let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
            assert_eq!(got.message.payload["title"], json!(i.to_string()));
        }
    }

    #[test]
    fn test_unavailable_fails_open() {
        let err = Unavailable.open().unwrap_err();
        assert!(err.is_capability_error());
        assert!(Unavailable.post(envelope("x")).is_err());
    }

    #[test]
    fn test_shared_bus_is_one_channel() {
        let a = LocalBus::shared();
        let b = LocalBus::shared();
        assert!(a.tx.same_channel(&b.tx));
    }
}
