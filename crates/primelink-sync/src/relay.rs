//! # Relay Server
//!
//! A small WebSocket fan-out server. Contexts running in different processes
//! each connect a [`RelayTransport`](crate::relay_client::RelayTransport) to
//! it, and every envelope one of them posts is forwarded to all the others.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Relay Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    RelayServer (Axum)                           │   │
//! │  │                                                                 │   │
//! │  │  /sync   ──▶ WebSocket upgrade ──▶ per-peer handler            │   │
//! │  │  /health ──▶ "OK"                                               │   │
//! │  │                        │                                        │   │
//! │  │          broadcast::channel<(peer_id, frame)>                   │   │
//! │  │         ┌──────────────┼──────────────┐                         │   │
//! │  │         ▼              ▼              ▼                         │   │
//! │  │  ┌──────────┐   ┌──────────┐   ┌──────────┐                    │   │
//! │  │  │  admin   │   │ tech shop│   │lifestyle │   connected peers  │   │
//! │  │  └──────────┘   └──────────┘   └──────────┘                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  A frame is never sent back to the peer it came from. Frames that do   │
//! │  not parse as envelopes are dropped. The relay keeps no state: a peer  │
//! │  that connects late catches up from its own durable snapshot.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RelaySettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::Envelope;

// =============================================================================
// Constants
// =============================================================================

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum message size (1MB).
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Fan-out buffer per peer before it starts lagging.
const FANOUT_CAPACITY: usize = 256;

// =============================================================================
// Relay State
// =============================================================================

/// A connected peer.
#[derive(Debug, Clone)]
pub struct ConnectedPeer {
    pub id: Uuid,
    pub addr: SocketAddr,
    pub connected_at: std::time::Instant,
}

struct RelayState {
    peers: RwLock<HashMap<Uuid, ConnectedPeer>>,
    fanout_tx: broadcast::Sender<(Uuid, String)>,
    relayed: AtomicU64,
}

impl RelayState {
    fn new() -> Self {
        let (fanout_tx, _) = broadcast::channel(FANOUT_CAPACITY);
        RelayState {
            peers: RwLock::new(HashMap::new()),
            fanout_tx,
            relayed: AtomicU64::new(0),
        }
    }
}

// =============================================================================
// Relay Server
// =============================================================================

/// The relay server.
pub struct RelayServer {
    settings: RelaySettings,
    state: Arc<RelayState>,
}

/// Handle for a running relay.
#[derive(Clone)]
pub struct RelayHandle {
    state: Arc<RelayState>,
    shutdown_tx: mpsc::Sender<()>,
    local_addr: SocketAddr,
}

impl RelayHandle {
    /// Number of connected peers.
    pub async fn peer_count(&self) -> usize {
        self.state.peers.read().await.len()
    }

    /// Connected peers.
    pub async fn peers(&self) -> Vec<ConnectedPeer> {
        self.state.peers.read().await.values().cloned().collect()
    }

    /// Number of envelopes accepted for fan-out since start.
    pub fn relayed_count(&self) -> u64 {
        self.state.relayed.load(Ordering::Relaxed)
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// WebSocket URL clients should connect to.
    pub fn sync_url(&self) -> String {
        format!("ws://{}/sync", self.local_addr)
    }

    /// Shuts down the relay server.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Relay shutdown channel closed".into()))
    }
}

impl RelayServer {
    /// Creates a server for `settings` (port 0 picks a free port).
    pub fn new(settings: RelaySettings) -> Self {
        RelayServer {
            settings,
            state: Arc::new(RelayState::new()),
        }
    }

    /// Binds, spawns the server, and returns a handle.
    pub async fn start(self) -> SyncResult<RelayHandle> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let app = Router::new()
            .route("/sync", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone());

        let bind_addr = self.settings.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| SyncError::ServerError(format!("Failed to bind to {}: {}", bind_addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SyncError::ServerError(format!("No local address: {}", e)))?;

        info!(addr = %local_addr, "Relay server started");

        tokio::spawn(async move {
            let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await;
                    info!("Relay server shutting down");
                })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "Relay server stopped with error");
            }
        });

        Ok(RelayHandle {
            state: self.state,
            shutdown_tx,
            local_addr,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    debug!(addr = %addr, "Relay upgrade request");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Runs one peer connection until it closes.
async fn handle_socket(socket: WebSocket, state: Arc<RelayState>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let peer_id = Uuid::new_v4();

    // Subscribe before registering so a peer counted as connected never
    // misses a frame.
    let mut fanout_rx = state.fanout_tx.subscribe();
    {
        let mut peers = state.peers.write().await;
        peers.insert(
            peer_id,
            ConnectedPeer {
                id: peer_id,
                addr,
                connected_at: std::time::Instant::now(),
            },
        );
        info!(peer = %peer_id, addr = %addr, peers = peers.len(), "Peer connected");
    }

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(64);

    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let forward_tx = outgoing_tx.clone();
    let forward_handle = tokio::spawn(async move {
        loop {
            match fanout_rx.recv().await {
                Ok((from, frame)) => {
                    if from == peer_id {
                        continue;
                    }
                    if forward_tx.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(peer = %peer_id, skipped, "Peer lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let ping_tx = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(PING_INTERVAL);
        loop {
            ping_interval.tick().await;
            if ping_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                break;
            }
        }
    });

    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => relay_frame(&state, peer_id, text.as_str()),
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => relay_frame(&state, peer_id, text),
                Err(_) => debug!(peer = %peer_id, "Dropping non-UTF-8 binary frame"),
            },
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) => {
                info!(peer = %peer_id, "Peer requested close");
                break;
            }
            Some(Err(e)) => {
                warn!(peer = %peer_id, ?e, "WebSocket error");
                break;
            }
            None => {
                info!(peer = %peer_id, "Peer disconnected");
                break;
            }
        }
    }

    ping_handle.abort();
    forward_handle.abort();
    outgoing_handle.abort();

    let mut peers = state.peers.write().await;
    if peers.remove(&peer_id).is_some() {
        info!(peer = %peer_id, peers = peers.len(), "Peer removed");
    }
}

/// Validates a frame and hands it to every other peer.
fn relay_frame(state: &RelayState, from: Uuid, frame: &str) {
    match Envelope::from_json(frame) {
        Ok(envelope) => {
            debug!(
                peer = %from,
                origin = %envelope.origin,
                msg_type = %envelope.message.kind,
                "Relaying envelope"
            );
            state.relayed.fetch_add(1, Ordering::Relaxed);
            let _ = state.fanout_tx.send((from, frame.to_string()));
        }
        Err(e) => {
            debug!(peer = %from, error = %e, "Dropping invalid frame");
        }
    }
}
