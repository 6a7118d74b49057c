//! # Sync Messages
//!
//! The typed events that carry admin configuration changes to storefronts.
//!
//! ## Message Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SyncMessage                                     │
//! │                                                                         │
//! │  type         UPDATE_THEME | UPDATE_TEXT | ... | UPDATE_MAGIC_MODE     │
//! │  payload      opaque JSON (never validated by the hub)                 │
//! │  timestamp    sender wall clock, epoch millis                          │
//! │  storeTarget  tech | lifestyle | both                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! ```json
//! { "type": "UPDATE_THEME", "payload": { "primaryColor": "#ff0000" },
//!   "timestamp": 1700000000000, "storeTarget": "both" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Message Type
// =============================================================================

/// The fixed set of configuration update kinds.
///
/// Each kind owns exactly one slot of the persisted snapshot (see
/// [`SyncMessageType::slot`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SyncMessageType {
    #[serde(rename = "UPDATE_THEME")]
    Theme,
    #[serde(rename = "UPDATE_TEXT")]
    Text,
    #[serde(rename = "UPDATE_LAYOUT")]
    Layout,
    #[serde(rename = "UPDATE_ANIMATION")]
    Animation,
    #[serde(rename = "UPDATE_CATEGORY")]
    Category,
    #[serde(rename = "UPDATE_DISCOUNT")]
    Discount,
    #[serde(rename = "UPDATE_BANNER")]
    Banner,
    #[serde(rename = "UPDATE_SEO")]
    Seo,
    #[serde(rename = "UPDATE_LOCALIZATION")]
    Localization,
    #[serde(rename = "UPDATE_MAGIC_MODE")]
    MagicMode,
}

impl SyncMessageType {
    /// Every message type, in declaration order.
    pub const ALL: [SyncMessageType; 10] = [
        SyncMessageType::Theme,
        SyncMessageType::Text,
        SyncMessageType::Layout,
        SyncMessageType::Animation,
        SyncMessageType::Category,
        SyncMessageType::Discount,
        SyncMessageType::Banner,
        SyncMessageType::Seo,
        SyncMessageType::Localization,
        SyncMessageType::MagicMode,
    ];

    /// Returns the wire tag (for logging).
    pub fn tag(&self) -> &'static str {
        match self {
            SyncMessageType::Theme => "UPDATE_THEME",
            SyncMessageType::Text => "UPDATE_TEXT",
            SyncMessageType::Layout => "UPDATE_LAYOUT",
            SyncMessageType::Animation => "UPDATE_ANIMATION",
            SyncMessageType::Category => "UPDATE_CATEGORY",
            SyncMessageType::Discount => "UPDATE_DISCOUNT",
            SyncMessageType::Banner => "UPDATE_BANNER",
            SyncMessageType::Seo => "UPDATE_SEO",
            SyncMessageType::Localization => "UPDATE_LOCALIZATION",
            SyncMessageType::MagicMode => "UPDATE_MAGIC_MODE",
        }
    }

    /// Returns the snapshot key this type is persisted under.
    pub fn slot(&self) -> &'static str {
        match self {
            SyncMessageType::Theme => "theme",
            SyncMessageType::Text => "text",
            SyncMessageType::Layout => "layout",
            SyncMessageType::Animation => "animation",
            SyncMessageType::Category => "category",
            SyncMessageType::Discount => "discount",
            SyncMessageType::Banner => "banner",
            SyncMessageType::Seo => "seo",
            SyncMessageType::Localization => "localization",
            SyncMessageType::MagicMode => "magicMode",
        }
    }
}

impl std::fmt::Display for SyncMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for SyncMessageType {
    type Err = CoreError;

    /// Accepts either the wire tag (`UPDATE_SEO`) or the slot key (`seo`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncMessageType::ALL
            .into_iter()
            .find(|kind| kind.tag() == s || kind.slot().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownMessageType(s.to_string()))
    }
}

// =============================================================================
// Audience
// =============================================================================

/// The storefront brand a consumer renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Storefront {
    Tech,
    Lifestyle,
}

impl std::fmt::Display for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Storefront::Tech => write!(f, "tech"),
            Storefront::Lifestyle => write!(f, "lifestyle"),
        }
    }
}

impl std::str::FromStr for Storefront {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tech" => Ok(Storefront::Tech),
            "lifestyle" => Ok(Storefront::Lifestyle),
            other => Err(CoreError::UnknownStorefront(other.to_string())),
        }
    }
}

/// Coarse audience filter carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StoreTarget {
    Tech,
    Lifestyle,
    #[default]
    Both,
}

impl StoreTarget {
    /// Returns true if a consumer rendering `storefront` should apply this message.
    pub fn includes(&self, storefront: Storefront) -> bool {
        match self {
            StoreTarget::Both => true,
            StoreTarget::Tech => storefront == Storefront::Tech,
            StoreTarget::Lifestyle => storefront == Storefront::Lifestyle,
        }
    }
}

impl From<Storefront> for StoreTarget {
    fn from(storefront: Storefront) -> Self {
        match storefront {
            Storefront::Tech => StoreTarget::Tech,
            Storefront::Lifestyle => StoreTarget::Lifestyle,
        }
    }
}

impl std::fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreTarget::Tech => write!(f, "tech"),
            StoreTarget::Lifestyle => write!(f, "lifestyle"),
            StoreTarget::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for StoreTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tech" => Ok(StoreTarget::Tech),
            "lifestyle" => Ok(StoreTarget::Lifestyle),
            "both" | "all" => Ok(StoreTarget::Both),
            other => Err(CoreError::UnknownStoreTarget(other.to_string())),
        }
    }
}

// =============================================================================
// Sync Message
// =============================================================================

/// A transient configuration update event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SyncMessage {
    /// Which snapshot slot and effect this message drives.
    #[serde(rename = "type")]
    pub kind: SyncMessageType,

    /// Type-dependent body. Never validated by the hub.
    pub payload: Value,

    /// Creation time on the sender's clock (epoch millis).
    #[ts(type = "number")]
    pub timestamp: i64,

    /// Audience filter.
    #[serde(default)]
    pub store_target: StoreTarget,
}

impl SyncMessage {
    /// Creates a message stamped with `timestamp`.
    pub fn new(kind: SyncMessageType, payload: Value, target: StoreTarget, timestamp: i64) -> Self {
        SyncMessage {
            kind,
            payload,
            timestamp,
            store_target: target,
        }
    }

    /// Returns true if a consumer rendering `storefront` should apply this message.
    pub fn is_for(&self, storefront: Storefront) -> bool {
        self.store_target.includes(storefront)
    }

    /// Serializes to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let msg = SyncMessage::new(
            SyncMessageType::Theme,
            json!({ "primaryColor": "#ff0000" }),
            StoreTarget::Both,
            1_700_000_000_000,
        );
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"UPDATE_THEME\""));
        assert!(json.contains("\"storeTarget\":\"both\""));
        assert!(json.contains("\"timestamp\":1700000000000"));
    }

    #[test]
    fn test_missing_target_defaults_to_both() {
        let msg = SyncMessage::from_json(
            r#"{"type":"UPDATE_SEO","payload":{"title":"A"},"timestamp":100}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, SyncMessageType::Seo);
        assert_eq!(msg.store_target, StoreTarget::Both);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = SyncMessage::from_json(r#"{"type":"UPDATE_PRICES","payload":{},"timestamp":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_audience_filtering() {
        assert!(StoreTarget::Both.includes(Storefront::Tech));
        assert!(StoreTarget::Both.includes(Storefront::Lifestyle));
        assert!(StoreTarget::Tech.includes(Storefront::Tech));
        assert!(!StoreTarget::Tech.includes(Storefront::Lifestyle));
        assert!(!StoreTarget::Lifestyle.includes(Storefront::Tech));
    }

    #[test]
    fn test_type_parsing() {
        assert_eq!("UPDATE_MAGIC_MODE".parse::<SyncMessageType>().unwrap(), SyncMessageType::MagicMode);
        assert_eq!("magicMode".parse::<SyncMessageType>().unwrap(), SyncMessageType::MagicMode);
        assert_eq!("seo".parse::<SyncMessageType>().unwrap(), SyncMessageType::Seo);
        assert!("prices".parse::<SyncMessageType>().is_err());
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("Tech".parse::<StoreTarget>().unwrap(), StoreTarget::Tech);
        assert_eq!("all".parse::<StoreTarget>().unwrap(), StoreTarget::Both);
        assert!("outlet".parse::<StoreTarget>().is_err());
        assert!("both".parse::<Storefront>().is_err());
    }

    #[test]
    fn test_slots_are_unique() {
        let mut slots: Vec<_> = SyncMessageType::ALL.iter().map(|k| k.slot()).collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), SyncMessageType::ALL.len());
    }
}
