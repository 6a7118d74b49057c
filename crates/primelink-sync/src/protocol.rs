//! # Envelope Protocol
//!
//! What actually travels between contexts.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Envelope (JSON text)                           │
//! │                                                                         │
//! │  {                                                                      │
//! │    "origin":  "<sending context uuid>",                                │
//! │    "message": {                                                         │
//! │      "type":        "UPDATE_THEME",                                     │
//! │      "payload":     { "primaryColor": "#ff0000" },                      │
//! │      "timestamp":   1700000000000,                                      │
//! │      "storeTarget": "both"                                              │
//! │    }                                                                    │
//! │  }                                                                      │
//! │                                                                         │
//! │  The origin lets a hub drop its own broadcasts when a transport        │
//! │  (the in-process bus) echoes them back.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use primelink_core::SyncMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

/// Identifier of one application context (one hub instance).
pub type ContextId = Uuid;

/// A sync message tagged with the context that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: ContextId,
    pub message: SyncMessage,
}

impl Envelope {
    pub fn new(origin: ContextId, message: SyncMessage) -> Self {
        Envelope { origin, message }
    }

    /// True if this envelope was sent by `context`.
    pub fn is_from(&self, context: ContextId) -> bool {
        self.origin == context
    }

    /// Serializes to a JSON text frame.
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a JSON text frame.
    ///
    /// Unknown message types are rejected here, so they never reach a hub.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json).map_err(|e| SyncError::InvalidEnvelope(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primelink_core::{StoreTarget, SyncMessageType};
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let origin = Uuid::new_v4();
        let msg = SyncMessage::new(
            SyncMessageType::Theme,
            json!({ "primaryColor": "#ff0000" }),
            StoreTarget::Tech,
            1_700_000_000_000,
        );
        let value: serde_json::Value = serde_json::from_str(&Envelope::new(origin, msg).to_json().unwrap()).unwrap();

        assert_eq!(value["origin"], json!(origin.to_string()));
        assert_eq!(value["message"]["type"], json!("UPDATE_THEME"));
        assert_eq!(value["message"]["storeTarget"], json!("tech"));
        assert_eq!(value["message"]["timestamp"], json!(1_700_000_000_000i64));
    }

    #[test]
    fn test_missing_target_defaults_to_both() {
        let raw = format!(
            r#"{{"origin":"{}","message":{{"type":"UPDATE_SEO","payload":{{"title":"Shop"}},"timestamp":5}}}}"#,
            Uuid::nil()
        );
        let envelope = Envelope::from_json(&raw).unwrap();
        assert_eq!(envelope.message.store_target, StoreTarget::Both);
        assert!(envelope.is_from(Uuid::nil()));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let raw = format!(
            r#"{{"origin":"{}","message":{{"type":"UPDATE_WEATHER","payload":{{}},"timestamp":5}}}}"#,
            Uuid::nil()
        );
        assert!(matches!(Envelope::from_json(&raw), Err(SyncError::InvalidEnvelope(_))));
    }
}
