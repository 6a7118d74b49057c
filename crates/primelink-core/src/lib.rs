//! # primelink-core: Pure Sync Logic for PrimeLink
//!
//! Message types, the durable snapshot model, and the effect reducers that
//! turn admin configuration updates into storefront document state. Zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PrimeLink Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Admin editors              Storefront renderers        │   │
//! │  │    theme / SEO / banners ...     tech shop · lifestyle shop    │   │
//! │  └───────────────┬─────────────────────────────▲───────────────────┘   │
//! │                  │ send()                      │ DocumentState         │
//! │  ┌───────────────▼─────────────────────────────┴───────────────────┐   │
//! │  │                  primelink-sync (hub + consumer)                │   │
//! │  └───────────────┬─────────────────────────────────────────────────┘   │
//! │                  │                                                      │
//! │  ┌───────────────▼─────────────────────────────────────────────────┐   │
//! │  │             ★ primelink-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  message  │  │   state   │  │  effects  │  │  payload  │  │   │
//! │  │   │SyncMessage│  │ Persisted │  │ reducers  │  │   views   │  │   │
//! │  │   │StoreTarget│  │ SyncState │  │ Document  │  │ MagicMode │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO CHANNELS • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`message`] - `SyncMessage`, message types and audience targets
//! - [`state`] - `PersistedSyncState`, the last-write-wins snapshot
//! - [`effects`] - `DocumentState` and the per-type reducers
//! - [`payload`] - Lenient payload views
//! - [`clock`] - Timestamp sources
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use primelink_core::effects::{apply_message, DocumentState, PRIMARY_PROPERTY};
//! use primelink_core::{StoreTarget, SyncMessage, SyncMessageType};
//! use serde_json::json;
//!
//! let msg = SyncMessage::new(
//!     SyncMessageType::Theme,
//!     json!({ "primaryColor": "#ff0000" }),
//!     StoreTarget::Both,
//!     1_700_000_000_000,
//! );
//!
//! let doc = apply_message(DocumentState::default(), &msg);
//! assert_eq!(doc.style_property(PRIMARY_PROPERTY), Some("#ff0000"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod effects;
pub mod error;
pub mod message;
pub mod payload;
pub mod state;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use effects::DocumentState;
pub use error::{CoreError, CoreResult};
pub use message::{StoreTarget, Storefront, SyncMessage, SyncMessageType};
pub use payload::MagicMode;
pub use state::PersistedSyncState;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Well-known storage key the durable snapshot lives under.
pub const DEFAULT_STORAGE_KEY: &str = "primelink_sync_state";

/// Default interval between reconciliation checks, in seconds.
pub const DEFAULT_RECONCILE_SECS: u64 = 10;
