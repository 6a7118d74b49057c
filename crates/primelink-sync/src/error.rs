//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! Most of these never reach a caller of `ConfigSyncHub`: broadcast failures
//! collapse into `is_connected() == false` and storage failures into the
//! empty snapshot. They surface from configuration loading, transport setup
//! and the relay server.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Unavailable    │  │  InvalidEnvelope        │ │
//! │  │  InvalidUrl     │  │  Connection     │  │  SerializationFailed    │ │
//! │  │  ConfigLoad/Save│  │  Timeout        │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid relay URL.
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The environment has no broadcast capability.
    #[error("Broadcast channel unavailable: {0}")]
    BroadcastUnavailable(String),

    /// Failed to establish a WebSocket connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket disconnected unexpectedly.
    #[error("Disconnected from relay")]
    Disconnected,

    /// Connection timeout.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Relay server failed to bind or serve.
    #[error("Relay server error: {0}")]
    ServerError(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Frame could not be read as an envelope.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Failed to serialize an envelope.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<primelink_store::StoreError> for SyncError {
    fn from(err: primelink_store::StoreError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed => SyncError::Disconnected,
            WsError::AlreadyClosed => SyncError::Disconnected,
            WsError::Protocol(p) => SyncError::WebSocketError(p.to_string()),
            WsError::Io(io) => SyncError::ConnectionFailed(io.to_string()),
            WsError::Tls(tls) => SyncError::TlsError(tls.to_string()),
            other => SyncError::WebSocketError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if this error means broadcast is not possible at all.
    pub fn is_capability_error(&self) -> bool {
        matches!(self, SyncError::BroadcastUnavailable(_) | SyncError::InvalidUrl(_))
    }
}
