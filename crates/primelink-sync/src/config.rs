//! # Sync Configuration
//!
//! Configuration for a sync context: which storefront it renders, where the
//! snapshot lives, and how broadcasts travel.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PRIMELINK_STOREFRONT=lifestyle                                     │
//! │     PRIMELINK_TRANSPORT=relay                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/primelink/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/com.primelink.hub/sync.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     tech storefront, in-process bus, memory storage                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storefront]
//! identity = "tech"            # tech | lifestyle
//!
//! [sync]
//! storage_key = "primelink_sync_state"
//! reconcile_interval_secs = 10
//!
//! [transport]
//! kind = "relay"               # local | relay | none
//! relay_url = "ws://127.0.0.1:8787/sync"
//!
//! [storage]
//! backend = "sqlite"           # memory | sqlite
//! path = "primelink.db"
//!
//! [relay]
//! bind_addr = "0.0.0.0"
//! port = 8787
//! ```

use std::path::PathBuf;
use std::time::Duration;

use primelink_core::{Storefront, DEFAULT_RECONCILE_SECS, DEFAULT_STORAGE_KEY};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Storefront Settings
// =============================================================================

/// Which storefront this context renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontSettings {
    #[serde(default = "default_identity")]
    pub identity: Storefront,
}

fn default_identity() -> Storefront {
    Storefront::Tech
}

impl Default for StorefrontSettings {
    fn default() -> Self {
        StorefrontSettings {
            identity: default_identity(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Snapshot and reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Key the durable snapshot is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Seconds between reconciliation checks.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_reconcile_interval() -> u64 {
    DEFAULT_RECONCILE_SECS
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            storage_key: default_storage_key(),
            reconcile_interval_secs: default_reconcile_interval(),
        }
    }
}

// =============================================================================
// Transport Settings
// =============================================================================

/// How broadcasts travel between contexts.
///
/// ## Kinds
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LOCAL (Default)   in-process bus, contexts share one process          │
/// │  RELAY             WebSocket client to a primelink-relay server        │
/// │  NONE              no broadcast; storage + reconciliation only         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Local,
    Relay,
    None,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Local => write!(f, "local"),
            TransportKind::Relay => write!(f, "relay"),
            TransportKind::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "bus" => Ok(TransportKind::Local),
            "relay" | "ws" | "websocket" => Ok(TransportKind::Relay),
            "none" | "off" | "disabled" => Ok(TransportKind::None),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown transport: '{}'. Valid options: local, relay, none",
                other
            ))),
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default)]
    pub kind: TransportKind,

    /// Relay WebSocket URL (relay transport only).
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    /// Connection timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Initial backoff duration (milliseconds) for reconnection.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds) for reconnection.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_relay_url() -> String {
    format!("ws://127.0.0.1:{}/sync", default_relay_port())
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    60
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            kind: TransportKind::default(),
            relay_url: default_relay_url(),
            connect_timeout_secs: default_connect_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Durable storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown storage backend: '{}'. Valid options: memory, sqlite",
                other
            ))),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite database file (sqlite backend only).
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("primelink.db")
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            backend: StorageBackend::default(),
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Relay Server Settings
// =============================================================================

/// Settings for the `primelink-relay` server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Listen port.
    #[serde(default = "default_relay_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

/// Default relay port.
pub const DEFAULT_RELAY_PORT: u16 = 8787;

fn default_relay_port() -> u16 {
    DEFAULT_RELAY_PORT
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            bind_addr: default_bind_addr(),
            port: default_relay_port(),
        }
    }
}

impl RelaySettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub storefront: StorefrontSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub transport: TransportSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub relay: RelaySettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml_str(contents: &str) -> SyncResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.sync.storage_key.trim().is_empty() {
            return Err(SyncError::InvalidConfig("storage_key must not be empty".into()));
        }

        if self.sync.reconcile_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "reconcile_interval_secs must be greater than 0".into(),
            ));
        }

        if self.transport.kind == TransportKind::Relay {
            validate_relay_url(&self.transport.relay_url)?;
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(identity) = std::env::var("PRIMELINK_STOREFRONT") {
            match identity.parse() {
                Ok(parsed) => {
                    debug!(storefront = %identity, "Overriding storefront from environment");
                    self.storefront.identity = parsed;
                }
                Err(_) => warn!(storefront = %identity, "Unknown storefront in environment"),
            }
        }

        if let Ok(key) = std::env::var("PRIMELINK_STORAGE_KEY") {
            self.sync.storage_key = key;
        }

        if let Ok(secs) = std::env::var("PRIMELINK_RECONCILE_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.sync.reconcile_interval_secs = s;
            }
        }

        if let Ok(kind) = std::env::var("PRIMELINK_TRANSPORT") {
            match kind.parse() {
                Ok(parsed) => {
                    debug!(transport = %kind, "Overriding transport from environment");
                    self.transport.kind = parsed;
                }
                Err(_) => warn!(transport = %kind, "Unknown transport in environment"),
            }
        }

        if let Ok(url) = std::env::var("PRIMELINK_RELAY_URL") {
            debug!(url = %url, "Overriding relay URL from environment");
            self.transport.relay_url = url;
        }

        if let Ok(backend) = std::env::var("PRIMELINK_STORAGE") {
            match backend.parse() {
                Ok(parsed) => self.storage.backend = parsed,
                Err(_) => warn!(backend = %backend, "Unknown storage backend in environment"),
            }
        }

        if let Ok(path) = std::env::var("PRIMELINK_DB_PATH") {
            self.storage.path = PathBuf::from(path);
        }

        if let Ok(port) = std::env::var("PRIMELINK_RELAY_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding relay port from environment");
                self.relay.port = p;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "primelink", "hub")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the storefront this context renders.
    pub fn storefront(&self) -> Storefront {
        self.storefront.identity
    }

    /// Returns the reconciliation interval.
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.sync.reconcile_interval_secs)
    }

    /// Returns the storage key.
    pub fn storage_key(&self) -> &str {
        &self.sync.storage_key
    }
}

/// Checks that `raw` parses and uses a WebSocket scheme.
pub fn validate_relay_url(raw: &str) -> SyncResult<url::Url> {
    let parsed = url::Url::parse(raw)?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(SyncError::InvalidUrl(format!(
            "Relay URL must start with ws:// or wss://, got scheme '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parsing() {
        assert_eq!("local".parse::<TransportKind>().unwrap(), TransportKind::Local);
        assert_eq!("relay".parse::<TransportKind>().unwrap(), TransportKind::Relay);
        assert_eq!("WS".parse::<TransportKind>().unwrap(), TransportKind::Relay);
        assert_eq!("none".parse::<TransportKind>().unwrap(), TransportKind::None);
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.storefront(), Storefront::Tech);
        assert_eq!(config.storage_key(), DEFAULT_STORAGE_KEY);
        assert_eq!(config.reconcile_interval(), Duration::from_secs(10));
        assert_eq!(config.transport.kind, TransportKind::Local);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.relay.bind_address(), "0.0.0.0:8787");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.sync.storage_key = "  ".into();
        assert!(config.validate().is_err());
        config.sync.storage_key = "state".into();

        config.sync.reconcile_interval_secs = 0;
        assert!(config.validate().is_err());
        config.sync.reconcile_interval_secs = 5;

        // Relay URL only matters when the relay transport is selected
        config.transport.relay_url = "http://invalid".into();
        assert!(config.validate().is_ok());
        config.transport.kind = TransportKind::Relay;
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.transport.relay_url = "wss://relay.example.com/sync".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
            [storefront]
            identity = "lifestyle"

            [transport]
            kind = "none"
            "#,
        )
        .unwrap();

        assert_eq!(config.storefront(), Storefront::Lifestyle);
        assert_eq!(config.transport.kind, TransportKind::None);
        assert_eq!(config.sync.reconcile_interval_secs, 10);
        assert_eq!(config.relay.port, 8787);
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[storefront]"));
        assert!(toml_str.contains("[transport]"));
        assert!(toml_str.contains("identity = \"tech\""));
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("primelink-sync-{}.toml", std::process::id()));
        let mut config = SyncConfig::default();
        config.storefront.identity = Storefront::Lifestyle;
        config.sync.storage_key = "custom_key".into();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let reloaded = SyncConfig::from_toml_str(&contents).unwrap();
        assert_eq!(reloaded.storefront(), Storefront::Lifestyle);
        assert_eq!(reloaded.storage_key(), "custom_key");

        let _ = std::fs::remove_file(&path);
    }
}
