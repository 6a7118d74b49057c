//! # Payload Views
//!
//! Lenient, read-only views over the opaque payloads of the message types
//! that have a built-in effect. Missing or ill-typed fields come back as
//! `None`; nothing here can fail.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Reads a string field, ignoring non-string values.
fn str_field(payload: &Value, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}

// =============================================================================
// Theme
// =============================================================================

/// Colour and font tokens carried by `UPDATE_THEME`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemePayload {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub background_color: Option<String>,
    pub font_family: Option<String>,
}

impl ThemePayload {
    pub fn from_value(payload: &Value) -> Self {
        ThemePayload {
            primary_color: str_field(payload, "primaryColor"),
            secondary_color: str_field(payload, "secondaryColor"),
            background_color: str_field(payload, "backgroundColor"),
            font_family: str_field(payload, "fontFamily"),
        }
    }
}

// =============================================================================
// SEO
// =============================================================================

/// Document metadata carried by `UPDATE_SEO`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeoPayload {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SeoPayload {
    pub fn from_value(payload: &Value) -> Self {
        SeoPayload {
            title: str_field(payload, "title"),
            description: str_field(payload, "description"),
        }
    }
}

// =============================================================================
// Localization
// =============================================================================

/// Document language carried by `UPDATE_LOCALIZATION`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizationPayload {
    pub language: Option<String>,
}

impl LocalizationPayload {
    /// Accepts `language` or the shorter `lang`.
    pub fn from_value(payload: &Value) -> Self {
        LocalizationPayload {
            language: str_field(payload, "language").or_else(|| str_field(payload, "lang")),
        }
    }
}

// =============================================================================
// Magic Mode
// =============================================================================

/// Mutually exclusive visual themes applied as a single body class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MagicMode {
    /// No magic class at all.
    #[default]
    Normal,
    Holiday,
    Sale,
    Minimal,
    Vibrant,
}

impl MagicMode {
    /// Every mode that owns a body class.
    pub const STYLED: [MagicMode; 4] = [
        MagicMode::Holiday,
        MagicMode::Sale,
        MagicMode::Minimal,
        MagicMode::Vibrant,
    ];

    /// Returns the body class for this mode, or `None` for `Normal`.
    pub fn class_name(&self) -> Option<&'static str> {
        match self {
            MagicMode::Normal => None,
            MagicMode::Holiday => Some("magic-holiday"),
            MagicMode::Sale => Some("magic-sale"),
            MagicMode::Minimal => Some("magic-minimal"),
            MagicMode::Vibrant => Some("magic-vibrant"),
        }
    }

    /// Parses a mode name; unknown names reset to `Normal`.
    pub fn parse_lenient(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "holiday" => MagicMode::Holiday,
            "sale" => MagicMode::Sale,
            "minimal" => MagicMode::Minimal,
            "vibrant" => MagicMode::Vibrant,
            _ => MagicMode::Normal,
        }
    }
}

/// Mode switch carried by `UPDATE_MAGIC_MODE`.
///
/// Accepts `{"mode": "sale"}` or a bare string payload `"sale"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MagicModePayload {
    pub mode: MagicMode,
}

impl MagicModePayload {
    pub fn from_value(payload: &Value) -> Self {
        let name = payload
            .as_str()
            .map(str::to_string)
            .or_else(|| str_field(payload, "mode"));

        MagicModePayload {
            mode: name.as_deref().map(MagicMode::parse_lenient).unwrap_or_default(),
        }
    }
}
