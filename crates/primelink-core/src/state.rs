//! # Persisted Sync State
//!
//! The durable, last-write-wins snapshot that lets late-joining or reloaded
//! contexts catch up on configuration they never saw broadcast.
//!
//! ## Snapshot Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Snapshot Lifecycle                                  │
//! │                                                                         │
//! │  (absent) ──first send()──► { theme: {...}, timestamp: t1 }            │
//! │                                   │                                     │
//! │                              send(UPDATE_SEO) at t2                     │
//! │                                   ▼                                     │
//! │                      { theme: {...}, seo: {...}, timestamp: t2 }       │
//! │                                   │                                     │
//! │                              send(UPDATE_THEME) at t3                   │
//! │                                   ▼                                     │
//! │                      { theme: {new}, seo: {...}, timestamp: t3 }       │
//! │                                                                         │
//! │  • One slot per message type, overwritten never appended               │
//! │  • Single aggregate timestamp                                          │
//! │  • Audience per slot in `targets` (absent = both)                      │
//! │  • Never deleted                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::message::{StoreTarget, Storefront, SyncMessage, SyncMessageType};

/// Durable snapshot of the latest payload for each message type.
///
/// Doubles as the "partial" argument of a merge: only the slots that are
/// `Some` in the partial replace slots in the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PersistedSyncState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub theme: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub text: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub layout: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub animation: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub category: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub discount: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub banner: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub seo: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub localization: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub magic_mode: Option<Value>,

    /// Audience of each slot, keyed by slot name. Only single-storefront
    /// slots are listed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, StoreTarget>,

    /// Time of the most recent merge (epoch millis). Zero means "never written".
    #[serde(default)]
    #[ts(type = "number")]
    pub timestamp: i64,
}

impl PersistedSyncState {
    /// Returns the empty snapshot (`timestamp = 0`).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no slot has ever been written.
    pub fn is_empty(&self) -> bool {
        SyncMessageType::ALL.iter().all(|kind| self.slot(*kind).is_none())
    }

    /// Returns the payload stored for `kind`, if any.
    pub fn slot(&self, kind: SyncMessageType) -> Option<&Value> {
        match kind {
            SyncMessageType::Theme => self.theme.as_ref(),
            SyncMessageType::Text => self.text.as_ref(),
            SyncMessageType::Layout => self.layout.as_ref(),
            SyncMessageType::Animation => self.animation.as_ref(),
            SyncMessageType::Category => self.category.as_ref(),
            SyncMessageType::Discount => self.discount.as_ref(),
            SyncMessageType::Banner => self.banner.as_ref(),
            SyncMessageType::Seo => self.seo.as_ref(),
            SyncMessageType::Localization => self.localization.as_ref(),
            SyncMessageType::MagicMode => self.magic_mode.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: SyncMessageType) -> &mut Option<Value> {
        match kind {
            SyncMessageType::Theme => &mut self.theme,
            SyncMessageType::Text => &mut self.text,
            SyncMessageType::Layout => &mut self.layout,
            SyncMessageType::Animation => &mut self.animation,
            SyncMessageType::Category => &mut self.category,
            SyncMessageType::Discount => &mut self.discount,
            SyncMessageType::Banner => &mut self.banner,
            SyncMessageType::Seo => &mut self.seo,
            SyncMessageType::Localization => &mut self.localization,
            SyncMessageType::MagicMode => &mut self.magic_mode,
        }
    }

    /// Returns the audience the slot for `kind` was written for.
    pub fn target_of(&self, kind: SyncMessageType) -> StoreTarget {
        self.targets.get(kind.slot()).copied().unwrap_or_default()
    }

    fn set_target(&mut self, kind: SyncMessageType, target: StoreTarget) {
        match target {
            StoreTarget::Both => {
                self.targets.remove(kind.slot());
            }
            single => {
                self.targets.insert(kind.slot().to_string(), single);
            }
        }
    }

    /// Builder-style slot setter, handy for partial snapshots.
    pub fn with_slot(self, kind: SyncMessageType, payload: Value) -> Self {
        self.with_targeted_slot(kind, payload, StoreTarget::Both)
    }

    /// Like [`with_slot`](Self::with_slot), for one audience.
    pub fn with_targeted_slot(mut self, kind: SyncMessageType, payload: Value, target: StoreTarget) -> Self {
        *self.slot_mut(kind) = Some(payload);
        self.set_target(kind, target);
        self
    }

    /// Iterates over the present slots in declaration order.
    pub fn present_slots(&self) -> impl Iterator<Item = (SyncMessageType, &Value)> {
        SyncMessageType::ALL
            .into_iter()
            .filter_map(move |kind| self.slot(kind).map(|payload| (kind, payload)))
    }

    /// Present slots whose audience includes `storefront`.
    pub fn slots_for(&self, storefront: Storefront) -> impl Iterator<Item = (SyncMessageType, &Value)> {
        self.present_slots()
            .filter(move |(kind, _)| self.target_of(*kind).includes(storefront))
    }

    /// Replaces the slot for `kind` with `payload` for both storefronts and
    /// bumps the timestamp.
    pub fn merge_payload(&mut self, kind: SyncMessageType, payload: Value, now: i64) {
        self.merge_targeted(kind, payload, StoreTarget::Both, now);
    }

    /// Replaces the slot for `kind`, records its audience, and bumps the
    /// timestamp.
    pub fn merge_targeted(&mut self, kind: SyncMessageType, payload: Value, target: StoreTarget, now: i64) {
        *self.slot_mut(kind) = Some(payload);
        self.set_target(kind, target);
        self.timestamp = now;
    }

    /// Merges a broadcast message into the snapshot, stamped with the message time.
    pub fn merge_message(&mut self, message: &SyncMessage) {
        self.merge_targeted(message.kind, message.payload.clone(), message.store_target, message.timestamp);
    }

    /// Replaces every slot present in `partial`, with its audience, and bumps
    /// the timestamp.
    ///
    /// The partial's own `timestamp` is ignored.
    pub fn merge_partial(&mut self, partial: &PersistedSyncState, now: i64) {
        for (kind, payload) in partial.present_slots() {
            *self.slot_mut(kind) = Some(payload.clone());
            self.set_target(kind, partial.target_of(kind));
        }
        self.timestamp = now;
    }

    /// Returns true if this snapshot is strictly newer than `last_applied`.
    pub fn is_newer_than(&self, last_applied: i64) -> bool {
        self.timestamp > last_applied
    }

    /// Parses a stored snapshot.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidSnapshot(e.to_string()))
    }

    /// Parses a stored snapshot, treating absence or corruption as "no state".
    pub fn from_json_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|json| Self::from_json(json).ok())
            .unwrap_or_default()
    }

    /// Serializes to the storage format.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StoreTarget;
    use serde_json::json;

    #[test]
    fn test_default_is_empty() {
        let state = PersistedSyncState::empty();
        assert!(state.is_empty());
        assert_eq!(state.timestamp, 0);
        assert_eq!(state.to_json().unwrap(), r#"{"timestamp":0}"#);
    }

    #[test]
    fn test_last_write_wins_across_types() {
        let mut state = PersistedSyncState::empty();
        state.merge_payload(SyncMessageType::Theme, json!({ "primaryColor": "#111" }), 100);
        state.merge_payload(SyncMessageType::Seo, json!({ "title": "Shop" }), 200);

        assert_eq!(state.theme, Some(json!({ "primaryColor": "#111" })));
        assert_eq!(state.seo, Some(json!({ "title": "Shop" })));
        assert_eq!(state.timestamp, 200);
    }

    #[test]
    fn test_same_slot_is_overwritten() {
        let mut state = PersistedSyncState::empty();
        state.merge_payload(SyncMessageType::Seo, json!({ "title": "A" }), 100);
        state.merge_payload(SyncMessageType::Seo, json!({ "title": "B" }), 200);
        assert_eq!(state.seo, Some(json!({ "title": "B" })));
        assert_eq!(state.present_slots().count(), 1);
    }

    #[test]
    fn test_merge_message_uses_message_time() {
        let msg = SyncMessage::new(SyncMessageType::Banner, json!({ "text": "Sale" }), StoreTarget::Tech, 42);
        let mut state = PersistedSyncState::empty();
        state.merge_message(&msg);
        assert_eq!(state.timestamp, 42);
        assert_eq!(state.slot(SyncMessageType::Banner), Some(&json!({ "text": "Sale" })));
    }

    #[test]
    fn test_targeted_merge_records_audience() {
        let mut state = PersistedSyncState::empty();
        let msg = SyncMessage::new(SyncMessageType::Seo, json!({ "title": "Gadgets" }), StoreTarget::Tech, 10);
        state.merge_message(&msg);
        state.merge_payload(SyncMessageType::Theme, json!({ "primaryColor": "#111" }), 20);

        assert_eq!(state.target_of(SyncMessageType::Seo), StoreTarget::Tech);
        assert_eq!(state.target_of(SyncMessageType::Theme), StoreTarget::Both);

        let tech: Vec<_> = state.slots_for(Storefront::Tech).map(|(kind, _)| kind).collect();
        let lifestyle: Vec<_> = state.slots_for(Storefront::Lifestyle).map(|(kind, _)| kind).collect();
        assert_eq!(tech, vec![SyncMessageType::Theme, SyncMessageType::Seo]);
        assert_eq!(lifestyle, vec![SyncMessageType::Theme]);

        // A later send to both clears the restriction
        state.merge_payload(SyncMessageType::Seo, json!({ "title": "Everyone" }), 30);
        assert!(state.targets.is_empty());
        assert_eq!(state.slots_for(Storefront::Lifestyle).count(), 2);
    }

    #[test]
    fn test_targets_survive_storage_roundtrip() {
        let state = PersistedSyncState::empty()
            .with_targeted_slot(SyncMessageType::Banner, json!({ "text": "Sale" }), StoreTarget::Lifestyle);
        let json = state.to_json().unwrap();
        assert!(json.contains(r#""targets":{"banner":"lifestyle"}"#));

        let parsed = PersistedSyncState::from_json(&json).unwrap();
        assert_eq!(parsed.target_of(SyncMessageType::Banner), StoreTarget::Lifestyle);

        // Snapshots written without targets read as "both"
        let legacy = PersistedSyncState::from_json(r#"{"seo":{"title":"A"},"timestamp":5}"#).unwrap();
        assert_eq!(legacy.target_of(SyncMessageType::Seo), StoreTarget::Both);
    }

    #[test]
    fn test_merge_partial_keeps_untouched_slots() {
        let mut state = PersistedSyncState::empty()
            .with_slot(SyncMessageType::Theme, json!({ "primaryColor": "#111" }))
            .with_slot(SyncMessageType::Seo, json!({ "title": "Old" }));
        let partial = PersistedSyncState {
            timestamp: 9_999,
            ..PersistedSyncState::empty().with_slot(SyncMessageType::Seo, json!({ "title": "New" }))
        };

        state.merge_partial(&partial, 300);

        assert_eq!(state.theme, Some(json!({ "primaryColor": "#111" })));
        assert_eq!(state.seo, Some(json!({ "title": "New" })));
        assert_eq!(state.timestamp, 300);
    }

    #[test]
    fn test_storage_format_uses_slot_keys() {
        let state = PersistedSyncState::empty().with_slot(SyncMessageType::MagicMode, json!({ "mode": "sale" }));
        let json = state.to_json().unwrap();
        assert!(json.contains("\"magicMode\""));
        assert!(!json.contains("\"theme\""));
    }

    #[test]
    fn test_corruption_is_no_state() {
        assert_eq!(PersistedSyncState::from_json_or_default(Some("{not json")), PersistedSyncState::empty());
        assert_eq!(PersistedSyncState::from_json_or_default(Some("42")), PersistedSyncState::empty());
        assert_eq!(PersistedSyncState::from_json_or_default(None), PersistedSyncState::empty());
        assert!(PersistedSyncState::from_json("{\"timestamp\":\"soon\"}").is_err());
    }

    #[test]
    fn test_newer_is_strict() {
        let state = PersistedSyncState { timestamp: 200, ..Default::default() };
        assert!(state.is_newer_than(199));
        assert!(!state.is_newer_than(200));
        assert!(!state.is_newer_than(201));
    }
}
