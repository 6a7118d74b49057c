//! # Error Types
//!
//! Domain error types for primelink-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  primelink-core errors (this file)                                     │
//! │  └── CoreError        - Parse failures for tags and snapshots          │
//! │                                                                         │
//! │  primelink-store errors (separate crate)                               │
//! │  └── StoreError       - Durable storage failures                       │
//! │                                                                         │
//! │  primelink-sync errors (separate crate)                                │
//! │  └── SyncError        - Transport, relay and config failures           │
//! │                                                                         │
//! │  Flow: CoreError → SyncError → logged and swallowed by the hub         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these ever reach a storefront visitor. The hub treats a broken
//! snapshot as "no state" and a broken payload as "no effect".

use thiserror::Error;

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Core parsing errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A message type tag outside the fixed enumeration.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// A store target other than tech, lifestyle or both.
    #[error("Unknown store target: '{0}'. Valid options: tech, lifestyle, both")]
    UnknownStoreTarget(String),

    /// A storefront identity other than tech or lifestyle.
    #[error("Unknown storefront: '{0}'. Valid options: tech, lifestyle")]
    UnknownStorefront(String),

    /// The persisted snapshot could not be parsed.
    ///
    /// ## When This Occurs
    /// - Storage holds truncated or hand-edited JSON
    /// - A slot holds something other than a JSON object key map
    /// - `timestamp` is not an integer
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Serialization of a message or snapshot failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl CoreError {
    /// Returns true if this error came from an unrecognized tag.
    pub fn is_unknown_tag(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownMessageType(_)
                | CoreError::UnknownStoreTarget(_)
                | CoreError::UnknownStorefront(_)
        )
    }
}
