//! # primelink-sync: Cross-Context Config Sync for PrimeLink
//!
//! Carries admin configuration changes (theme, SEO, banners, ...) to every
//! open storefront renderer, and keeps a durable last-write-wins snapshot
//! that renderers reconcile against when a broadcast is missed.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Layer Architecture                          │
//! │                                                                         │
//! │   Admin context                         Storefront context             │
//! │  ┌────────────────────┐                ┌────────────────────────────┐  │
//! │  │  ConfigSyncHub     │                │  ConfigSyncHub             │  │
//! │  │                    │   Envelope     │        │ listen()          │  │
//! │  │  send(kind, data) ─┼───────────────►│        ▼                   │  │
//! │  │        │           │  (transport)   │  ConfigConsumer            │  │
//! │  │        ▼           │                │   • audience filter        │  │
//! │  │  merge into        │                │   • effect reducers        │  │
//! │  │  snapshot ─────────┼──┐             │   • periodic reconcile ◄─┐ │  │
//! │  └────────────────────┘  │             └──────────────────────────┼─┘  │
//! │                          ▼                                        │    │
//! │               ┌─────────────────────┐                             │    │
//! │               │ SnapshotStore       │─────────────────────────────┘    │
//! │               │ (memory / SQLite)   │   get_persisted_state()         │
//! │               └─────────────────────┘                                  │
//! │                                                                         │
//! │  TRANSPORTS:                                                           │
//! │  • LocalBus       - in-process broadcast channel                       │
//! │  • RelayTransport - WebSocket client to a RelayServer                  │
//! │  • Unavailable    - storage + reconciliation only                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`hub`] - `ConfigSyncHub`: send, listen, snapshot access
//! - [`consumer`] - `ConfigConsumer`: storefront-side effects and reconciliation
//! - [`transport`] - `BroadcastTransport` trait, `LocalBus`, `Unavailable`
//! - [`relay_client`] - WebSocket transport with reconnect and backoff
//! - [`relay`] - Axum WebSocket fan-out server
//! - [`protocol`] - Wire envelope
//! - [`config`] - TOML + environment configuration
//! - [`factory`] - Hubs built from configuration
//! - [`error`] - Sync error types
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use primelink_core::{Storefront, SyncMessageType};
//! use primelink_store::MemoryStore;
//! use primelink_sync::{ConfigConsumer, ConfigSyncHub, LocalBus};
//! use serde_json::json;
//!
//! # async fn demo() {
//! let bus = LocalBus::new();
//! let store = Arc::new(MemoryStore::new());
//!
//! let admin = ConfigSyncHub::new(store.clone(), Arc::new(bus.clone()));
//! let shop = ConfigSyncHub::new(store, Arc::new(bus));
//!
//! let consumer = ConfigConsumer::new(shop, Storefront::Tech).mount().await;
//! admin.send(SyncMessageType::Theme, json!({ "primaryColor": "#ff0000" })).await;
//! # drop(consumer);
//! # }
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod factory;
pub mod hub;
pub mod protocol;
pub mod relay;
pub mod relay_client;
pub mod transport;

pub use config::{
    RelaySettings, StorageBackend, StorageSettings, StorefrontSettings, SyncConfig, SyncSettings, TransportKind,
    TransportSettings, DEFAULT_RELAY_PORT,
};
pub use consumer::{ConfigConsumer, ConsumerHandle, ConsumerPhase, ConsumerStatus};
pub use error::{SyncError, SyncResult};
pub use factory::{build_store, build_transport, connect};
pub use hub::{ConfigSyncHub, HubOptions, Subscription};
pub use protocol::{ContextId, Envelope};
pub use relay::{RelayHandle, RelayServer};
pub use relay_client::{ConnectionState, RelayClientConfig, RelayTransport};
pub use transport::{BroadcastTransport, LocalBus, Unavailable};
