//! # Effect Reducers
//!
//! Turns configuration messages into document state. Every reducer is a pure
//! function `(DocumentState, &payload) -> DocumentState`; the consumer in
//! `primelink-sync` owns the current state and swaps it atomically.
//!
//! ## Dispatch Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Message Type → Effect                             │
//! │                                                                         │
//! │  UPDATE_THEME          ──► root custom properties                      │
//! │                            --primary --secondary --background          │
//! │                            --font-family                               │
//! │  UPDATE_SEO            ──► title, <meta name="description">            │
//! │  UPDATE_LOCALIZATION   ──► <html lang>                                 │
//! │  UPDATE_MAGIC_MODE     ──► body class (one of magic-*)                 │
//! │                                                                         │
//! │  UPDATE_TEXT, UPDATE_LAYOUT, UPDATE_ANIMATION, UPDATE_CATEGORY,        │
//! │  UPDATE_DISCOUNT, UPDATE_BANNER                                        │
//! │                        ──► passthrough to caller callbacks             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::message::{Storefront, SyncMessage, SyncMessageType};
use crate::payload::{LocalizationPayload, MagicMode, MagicModePayload, SeoPayload, ThemePayload};
use crate::state::PersistedSyncState;

// =============================================================================
// Constants
// =============================================================================

/// Root custom property for the primary brand colour.
pub const PRIMARY_PROPERTY: &str = "--primary";

/// Root custom property for the secondary brand colour.
pub const SECONDARY_PROPERTY: &str = "--secondary";

/// Root custom property for the page background.
pub const BACKGROUND_PROPERTY: &str = "--background";

/// Root custom property for the body font stack.
pub const FONT_PROPERTY: &str = "--font-family";

/// Meta tag written by SEO updates.
pub const DESCRIPTION_META: &str = "description";

// =============================================================================
// Document State
// =============================================================================

/// The slice of a rendered document that configuration updates touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentState {
    /// Custom properties on the document root.
    pub root_style: BTreeMap<String, String>,

    /// Document title.
    pub title: Option<String>,

    /// Meta tags by name.
    pub meta: BTreeMap<String, String>,

    /// Document language attribute.
    pub lang: Option<String>,

    /// Classes on the document body.
    pub body_classes: BTreeSet<String>,
}

impl DocumentState {
    /// Returns a root custom property.
    pub fn style_property(&self, name: &str) -> Option<&str> {
        self.root_style.get(name).map(String::as_str)
    }

    /// Returns the content of a meta tag.
    pub fn meta_content(&self, name: &str) -> Option<&str> {
        self.meta.get(name).map(String::as_str)
    }

    /// Returns true if the body carries `class`.
    pub fn has_body_class(&self, class: &str) -> bool {
        self.body_classes.contains(class)
    }

    /// Returns the active magic mode, derived from the body classes.
    pub fn magic_mode(&self) -> MagicMode {
        MagicMode::STYLED
            .into_iter()
            .find(|mode| mode.class_name().is_some_and(|class| self.has_body_class(class)))
            .unwrap_or_default()
    }

    fn set_style(&mut self, name: &str, value: Option<String>) {
        if let Some(value) = value {
            self.root_style.insert(name.to_string(), value);
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// A pure document reducer.
pub type Reducer = fn(DocumentState, &Value) -> DocumentState;

/// What a consumer does with a message of a given type.
#[derive(Clone, Copy)]
pub enum Effect {
    /// Built-in document effect.
    Document(Reducer),
    /// No built-in effect; handed to caller callbacks.
    Passthrough,
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Document(_) => write!(f, "Document"),
            Effect::Passthrough => write!(f, "Passthrough"),
        }
    }
}

/// Returns the effect registered for `kind`.
pub fn effect_for(kind: SyncMessageType) -> Effect {
    match kind {
        SyncMessageType::Theme => Effect::Document(apply_theme),
        SyncMessageType::Seo => Effect::Document(apply_seo),
        SyncMessageType::Localization => Effect::Document(apply_localization),
        SyncMessageType::MagicMode => Effect::Document(apply_magic_mode),
        SyncMessageType::Text
        | SyncMessageType::Layout
        | SyncMessageType::Animation
        | SyncMessageType::Category
        | SyncMessageType::Discount
        | SyncMessageType::Banner => Effect::Passthrough,
    }
}

/// Applies a single message's built-in effect.
///
/// Passthrough types leave the document untouched.
pub fn apply_message(doc: DocumentState, message: &SyncMessage) -> DocumentState {
    apply_payload(doc, message.kind, &message.payload)
}

/// Applies the built-in effect for `kind` with `payload`.
pub fn apply_payload(doc: DocumentState, kind: SyncMessageType, payload: &Value) -> DocumentState {
    match effect_for(kind) {
        Effect::Document(reducer) => reducer(doc, payload),
        Effect::Passthrough => doc,
    }
}

/// Applies every present slot addressed to `storefront` that has a
/// built-in effect.
///
/// Applying the same snapshot twice yields the same document.
pub fn apply_snapshot(doc: DocumentState, snapshot: &PersistedSyncState, storefront: Storefront) -> DocumentState {
    snapshot
        .slots_for(storefront)
        .fold(doc, |doc, (kind, payload)| apply_payload(doc, kind, payload))
}

// =============================================================================
// Reducers
// =============================================================================

/// Sets the root colour and font properties present in the payload.
pub fn apply_theme(mut doc: DocumentState, payload: &Value) -> DocumentState {
    let theme = ThemePayload::from_value(payload);
    doc.set_style(PRIMARY_PROPERTY, theme.primary_color);
    doc.set_style(SECONDARY_PROPERTY, theme.secondary_color);
    doc.set_style(BACKGROUND_PROPERTY, theme.background_color);
    doc.set_style(FONT_PROPERTY, theme.font_family);
    doc
}

/// Sets the title and/or the description meta tag (created if absent).
pub fn apply_seo(mut doc: DocumentState, payload: &Value) -> DocumentState {
    let seo = SeoPayload::from_value(payload);
    if let Some(title) = seo.title {
        doc.title = Some(title);
    }
    if let Some(description) = seo.description {
        doc.meta.insert(DESCRIPTION_META.to_string(), description);
    }
    doc
}

/// Sets the document language.
pub fn apply_localization(mut doc: DocumentState, payload: &Value) -> DocumentState {
    if let Some(language) = LocalizationPayload::from_value(payload).language {
        doc.lang = Some(language);
    }
    doc
}

/// Clears every magic class, then adds the one for the new mode.
pub fn apply_magic_mode(mut doc: DocumentState, payload: &Value) -> DocumentState {
    let mode = MagicModePayload::from_value(payload).mode;
    for styled in MagicMode::STYLED {
        if let Some(class) = styled.class_name() {
            doc.body_classes.remove(class);
        }
    }
    if let Some(class) = mode.class_name() {
        doc.body_classes.insert(class.to_string());
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StoreTarget;
    use serde_json::json;

    fn snapshot() -> PersistedSyncState {
        PersistedSyncState {
            timestamp: 500,
            ..PersistedSyncState::empty()
                .with_slot(SyncMessageType::Theme, json!({ "primaryColor": "#ff0000", "fontFamily": "Inter" }))
                .with_slot(SyncMessageType::Seo, json!({ "title": "Tech Store", "description": "Gadgets" }))
                .with_slot(SyncMessageType::Localization, json!({ "language": "en" }))
                .with_slot(SyncMessageType::MagicMode, json!({ "mode": "holiday" }))
                .with_slot(SyncMessageType::Banner, json!({ "text": "Free shipping" }))
        }
    }

    #[test]
    fn test_theme_sets_root_properties() {
        let doc = apply_theme(DocumentState::default(), &json!({ "primaryColor": "#ff0000" }));
        assert_eq!(doc.style_property(PRIMARY_PROPERTY), Some("#ff0000"));
        assert_eq!(doc.style_property(SECONDARY_PROPERTY), None);
    }

    #[test]
    fn test_theme_keeps_unmentioned_properties() {
        let doc = apply_theme(DocumentState::default(), &json!({ "secondaryColor": "#00ff00" }));
        let doc = apply_theme(doc, &json!({ "primaryColor": "#ff0000" }));
        assert_eq!(doc.style_property(SECONDARY_PROPERTY), Some("#00ff00"));
        assert_eq!(doc.style_property(PRIMARY_PROPERTY), Some("#ff0000"));
    }

    #[test]
    fn test_seo_creates_description_meta() {
        let doc = apply_seo(DocumentState::default(), &json!({ "description": "Best deals" }));
        assert_eq!(doc.meta_content(DESCRIPTION_META), Some("Best deals"));
        assert_eq!(doc.title, None);

        let doc = apply_seo(doc, &json!({ "title": "Shop" }));
        assert_eq!(doc.title.as_deref(), Some("Shop"));
        assert_eq!(doc.meta_content(DESCRIPTION_META), Some("Best deals"));
    }

    #[test]
    fn test_magic_mode_is_exclusive() {
        let doc = apply_magic_mode(DocumentState::default(), &json!({ "mode": "holiday" }));
        let doc = apply_magic_mode(doc, &json!({ "mode": "sale" }));
        assert!(doc.has_body_class("magic-sale"));
        assert!(!doc.has_body_class("magic-holiday"));
        assert_eq!(doc.magic_mode(), MagicMode::Sale);
    }

    #[test]
    fn test_magic_mode_normal_resets() {
        let mut doc = DocumentState::default();
        doc.body_classes.insert("dark".to_string());
        let doc = apply_magic_mode(doc, &json!({ "mode": "vibrant" }));
        let doc = apply_magic_mode(doc, &json!({ "mode": "normal" }));
        assert_eq!(doc.magic_mode(), MagicMode::Normal);
        assert!(doc.has_body_class("dark"));
        assert_eq!(doc.body_classes.len(), 1);
    }

    #[test]
    fn test_passthrough_types_leave_document_alone() {
        let msg = SyncMessage::new(SyncMessageType::Banner, json!({ "title": "Nope" }), StoreTarget::Both, 1);
        assert_eq!(apply_message(DocumentState::default(), &msg), DocumentState::default());
        assert!(matches!(effect_for(SyncMessageType::Discount), Effect::Passthrough));
    }

    #[test]
    fn test_snapshot_applies_all_document_slots() {
        let doc = apply_snapshot(DocumentState::default(), &snapshot(), Storefront::Tech);
        assert_eq!(doc.style_property(PRIMARY_PROPERTY), Some("#ff0000"));
        assert_eq!(doc.style_property(FONT_PROPERTY), Some("Inter"));
        assert_eq!(doc.title.as_deref(), Some("Tech Store"));
        assert_eq!(doc.lang.as_deref(), Some("en"));
        assert!(doc.has_body_class("magic-holiday"));
    }

    #[test]
    fn test_snapshot_skips_slots_for_other_storefront() {
        let snapshot = PersistedSyncState::empty()
            .with_targeted_slot(SyncMessageType::Seo, json!({ "title": "Gadgets" }), StoreTarget::Tech)
            .with_targeted_slot(SyncMessageType::Localization, json!({ "language": "fr" }), StoreTarget::Lifestyle)
            .with_slot(SyncMessageType::Theme, json!({ "primaryColor": "#00ff00" }));

        let lifestyle = apply_snapshot(DocumentState::default(), &snapshot, Storefront::Lifestyle);
        assert_eq!(lifestyle.title, None);
        assert_eq!(lifestyle.lang.as_deref(), Some("fr"));
        assert_eq!(lifestyle.style_property(PRIMARY_PROPERTY), Some("#00ff00"));

        let tech = apply_snapshot(DocumentState::default(), &snapshot, Storefront::Tech);
        assert_eq!(tech.title.as_deref(), Some("Gadgets"));
        assert_eq!(tech.lang, None);
    }

    #[test]
    fn test_snapshot_application_is_idempotent() {
        let once = apply_snapshot(DocumentState::default(), &snapshot(), Storefront::Tech);
        let twice = apply_snapshot(once.clone(), &snapshot(), Storefront::Tech);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_payload_is_noop() {
        let doc = apply_snapshot(DocumentState::default(), &snapshot(), Storefront::Tech);
        let after = apply_theme(doc.clone(), &json!("not an object"));
        assert_eq!(doc, after);
    }
}
