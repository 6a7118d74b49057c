//! # primelink-store: Durable Snapshot Storage for PrimeLink
//!
//! Holds the last-known configuration snapshot so a storefront that opens
//! late, or missed a broadcast, can catch up.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PrimeLink Data Flow                              │
//! │                                                                         │
//! │  ConfigSyncHub::send / reconcile                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 primelink-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ SnapshotCell  │───►│ SnapshotStore │◄───│ SqliteStore  │  │   │
//! │  │   │ (typed JSON)  │    │    (trait)    │    │   (SQLite)   │  │   │
//! │  │   └───────────────┘    └───────▲───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                        ┌───────┴───────┐                       │   │
//! │  │                        │  MemoryStore  │                       │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use primelink_store::{SqliteStore, SnapshotCell, StoreConfig};
//!
//! let db = SqliteStore::new(StoreConfig::new("primelink.db")).await?;
//! let cell = SnapshotCell::new(Arc::new(db), "primelink_sync_state");
//! let snapshot = cell.load().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod snapshot;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{SqliteStore, StoreConfig};
pub use repository::KvRepository;
pub use snapshot::SnapshotCell;
pub use store::{MemoryStore, SnapshotStore};
