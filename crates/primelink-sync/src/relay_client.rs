//! # Relay Client Transport
//!
//! WebSocket client to a `primelink-relay` server, with automatic
//! reconnection and backoff. Lets contexts in different processes (or on
//! different machines) share broadcasts.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    WebSocket Connection States                          │
//! │                                                                         │
//! │  ┌────────────┐     open()      ┌────────────┐                         │
//! │  │Disconnected│ ──────────────► │ Connecting │                         │
//! │  └────────────┘                 └─────┬──────┘                         │
//! │        ▲                              │                                 │
//! │        │                    success   │   failure                       │
//! │        │                        ┌─────┴─────┐                          │
//! │        │                        ▼           ▼                           │
//! │        │              ┌────────────┐  ┌────────────┐                   │
//! │        │              │ Connected  │  │ Backoff    │                   │
//! │        │              └─────┬──────┘  └─────┬──────┘                   │
//! │        │                    │               │                           │
//! │        │              disconnect/error      │  timer expired            │
//! │        │                    │               │                           │
//! │        │                    ▼               │                           │
//! │        │              ┌────────────┐        │                           │
//! │        └───────────── │Reconnecting│ ◄──────┘                          │
//! │         close()       └────────────┘                                    │
//! │                                                                         │
//! │  Envelopes posted while disconnected queue in the outgoing channel     │
//! │  and flush once connected. No other retry exists.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::{validate_relay_url, TransportSettings};
use crate::error::{SyncError, SyncResult};
use crate::protocol::Envelope;
use crate::transport::{BroadcastTransport, INBOUND_CAPACITY};

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for the relay client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Attempting to connect.
    Connecting,
    /// Connected and ready.
    Connected,
    /// Waiting before reconnection attempt.
    Backoff,
    /// Reconnection in progress.
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Backoff => write!(f, "backoff"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the relay client.
#[derive(Debug, Clone)]
pub struct RelayClientConfig {
    /// WebSocket URL of the relay, e.g. `ws://127.0.0.1:8787/sync`.
    pub url: String,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Initial backoff duration.
    pub initial_backoff: Duration,

    /// Maximum backoff duration.
    pub max_backoff: Duration,

    /// Ping interval for keepalive.
    pub ping_interval: Duration,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        RelayClientConfig {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl From<&TransportSettings> for RelayClientConfig {
    fn from(settings: &TransportSettings) -> Self {
        RelayClientConfig {
            url: settings.relay_url.clone(),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
            ..Default::default()
        }
    }
}

// =============================================================================
// Relay Transport
// =============================================================================

/// Channels to the running connection task.
struct ClientHandle {
    outgoing_tx: mpsc::Sender<Envelope>,
    shutdown_tx: mpsc::Sender<()>,
}

/// [`BroadcastTransport`] over a relay WebSocket.
///
/// ## Usage
/// ```rust,ignore
/// let transport = RelayTransport::new(RelayClientConfig {
///     url: "ws://127.0.0.1:8787/sync".into(),
///     ..Default::default()
/// });
/// let hub = ConfigSyncHub::new(store, Arc::new(transport));
/// ```
pub struct RelayTransport {
    config: RelayClientConfig,
    state: Arc<RwLock<ConnectionState>>,
    handle: Mutex<Option<ClientHandle>>,
}

impl RelayTransport {
    pub fn new(config: RelayClientConfig) -> Self {
        RelayTransport {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            handle: Mutex::new(None),
        }
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Returns true if the socket is currently up.
    pub async fn is_online(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// The relay URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl BroadcastTransport for RelayTransport {
    fn open(&self) -> SyncResult<mpsc::Receiver<Envelope>> {
        validate_relay_url(&self.config.url)?;

        let mut slot = self
            .handle
            .lock()
            .map_err(|_| SyncError::ChannelError("relay handle lock poisoned".into()))?;
        if slot.is_some() {
            return Err(SyncError::InvalidConfig("relay transport already open".into()));
        }

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<Envelope>(INBOUND_CAPACITY);
        let (incoming_tx, incoming_rx) = mpsc::channel::<Envelope>(INBOUND_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let connection = RelayConnection {
            config: self.config.clone(),
            state: self.state.clone(),
            outgoing_rx,
            incoming_tx,
            shutdown_rx,
        };
        tokio::spawn(connection.run());

        *slot = Some(ClientHandle {
            outgoing_tx,
            shutdown_tx,
        });
        Ok(incoming_rx)
    }

    fn post(&self, envelope: Envelope) -> SyncResult<()> {
        let slot = self
            .handle
            .lock()
            .map_err(|_| SyncError::ChannelError("relay handle lock poisoned".into()))?;
        let handle = slot
            .as_ref()
            .ok_or_else(|| SyncError::ChannelError("relay transport not open".into()))?;
        handle
            .outgoing_tx
            .try_send(envelope)
            .map_err(|e| SyncError::ChannelError(format!("Failed to queue envelope: {}", e)))
    }

    fn close(&self) {
        if let Ok(mut slot) = self.handle.lock() {
            if let Some(handle) = slot.take() {
                let _ = handle.shutdown_tx.try_send(());
            }
        }
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}

impl Drop for RelayTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Connection Task
// =============================================================================

struct RelayConnection {
    config: RelayClientConfig,
    state: Arc<RwLock<ConnectionState>>,
    outgoing_rx: mpsc::Receiver<Envelope>,
    incoming_tx: mpsc::Sender<Envelope>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl RelayConnection {
    /// Main reconnect loop.
    async fn run(mut self) {
        info!(url = %self.config.url, "Relay client starting");

        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            // Shutdown requested, or every handle dropped
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            *self.state.write().await = ConnectionState::Connecting;

            match self.connect_with_timeout().await {
                Ok(ws_stream) => {
                    info!(url = %self.config.url, "Relay connected");
                    *self.state.write().await = ConnectionState::Connected;
                    backoff.reset();
                    attempt = 0;

                    match self.connection_loop(ws_stream).await {
                        Ok(true) => break,
                        Ok(false) => info!("Relay connection closed"),
                        Err(e) => warn!(?e, "Relay connection ended"),
                    }
                }
                Err(e) => {
                    error!(?e, "Failed to connect to relay");
                }
            }

            *self.state.write().await = ConnectionState::Backoff;
            attempt += 1;

            let Some(duration) = backoff.next_backoff() else {
                error!("Backoff exhausted");
                break;
            };
            debug!(?duration, attempt, "Waiting before reconnect");

            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    *self.state.write().await = ConnectionState::Reconnecting;
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown during backoff");
                    break;
                }
            }
        }

        *self.state.write().await = ConnectionState::Disconnected;
        info!("Relay client stopped");
    }

    async fn connect_with_timeout(&self) -> SyncResult<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        match timeout(self.config.connect_timeout, connect_async(&self.config.url)).await {
            Ok(Ok((ws_stream, response))) => {
                debug!(status = ?response.status(), "WebSocket handshake complete");
                Ok(ws_stream)
            }
            Ok(Err(e)) => Err(SyncError::from(e)),
            Err(_) => Err(SyncError::Timeout(self.config.connect_timeout.as_secs())),
        }
    }

    /// Pumps one live connection. Returns `Ok(true)` when shutdown was requested.
    async fn connection_loop(
        &mut self,
        ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    ) -> SyncResult<bool> {
        let (mut write, mut read) = ws_stream.split();

        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(envelope) = self.outgoing_rx.recv() => {
                    let json = envelope.to_json()?;
                    debug!(msg_type = %envelope.message.kind, "Posting to relay");
                    write.send(WsMessage::Text(json.into())).await?;
                }

                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => match Envelope::from_json(text.as_str()) {
                            Ok(envelope) => {
                                debug!(msg_type = %envelope.message.kind, "Received from relay");
                                if self.incoming_tx.send(envelope).await.is_err() {
                                    info!("Inbound receiver dropped");
                                    return Ok(true);
                                }
                            }
                            Err(e) => warn!(?e, "Dropping malformed envelope"),
                        },
                        Some(Ok(WsMessage::Ping(data))) => {
                            write.send(WsMessage::Pong(data)).await?;
                        }
                        Some(Ok(WsMessage::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(?frame, "Received close frame");
                            return Ok(false);
                        }
                        Some(Ok(WsMessage::Binary(_))) => {
                            warn!("Received unexpected binary message");
                        }
                        Some(Ok(WsMessage::Frame(_))) => {}
                        Some(Err(e)) => {
                            error!(?e, "WebSocket error");
                            return Err(SyncError::from(e));
                        }
                        None => return Err(SyncError::Disconnected),
                    }
                }

                _ = ping_interval.tick() => {
                    write.send(WsMessage::Ping(Vec::new().into())).await?;
                    debug!("Sent ping");
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, closing relay connection");
                    let _ = write.send(WsMessage::Close(None)).await;
                    return Ok(true);
                }
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Backoff.to_string(), "backoff");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = TransportSettings {
            relay_url: "ws://relay.local:9000/sync".into(),
            initial_backoff_ms: 250,
            ..Default::default()
        };
        let config = RelayClientConfig::from(&settings);
        assert_eq!(config.url, "ws://relay.local:9000/sync");
        assert_eq!(config.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_invalid_url_is_capability_failure() {
        let transport = RelayTransport::new(RelayClientConfig {
            url: "http://not-a-websocket".into(),
            ..Default::default()
        });
        let err = transport.open().unwrap_err();
        assert!(err.is_capability_error());
    }

    #[tokio::test]
    async fn test_post_before_open_fails() {
        let transport = RelayTransport::new(RelayClientConfig::default());
        assert!(transport
            .post(Envelope::new(
                uuid::Uuid::nil(),
                primelink_core::SyncMessage::new(
                    primelink_core::SyncMessageType::Text,
                    serde_json::json!({}),
                    primelink_core::StoreTarget::Both,
                    0,
                ),
            ))
            .is_err());
        assert_eq!(transport.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_double_open_rejected() {
        let transport = RelayTransport::new(RelayClientConfig {
            url: "ws://127.0.0.1:9/sync".into(),
            initial_backoff: Duration::from_secs(60),
            ..Default::default()
        });
        let _rx = transport.open().unwrap();
        assert!(transport.open().is_err());
        transport.close();
    }
}
