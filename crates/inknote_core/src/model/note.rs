//! Note record, ink payload and viewport.
//!
//! # Responsibility
//! - Define the canonical note record shared by store, editor and FFI.
//! - Own the viewport "approximately default" rule used before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `deleted_at` is `Some` only while the note sits in recently-deleted.
//! - A viewport within tolerance of the default is never persisted.

use crate::model::background::BackgroundPreset;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Stable identifier for a note.
pub type NoteId = Uuid;

/// Offsets closer than this to the origin count as the default viewport.
pub const VIEWPORT_OFFSET_TOLERANCE: f64 = 0.5;
/// Zoom scales closer than this to `1.0` count as the default viewport.
pub const VIEWPORT_ZOOM_TOLERANCE: f64 = 0.01;

/// Serialized stroke data produced by the drawing surface.
///
/// Encoded as standard base64 text in the persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InkData(Vec<u8>);

impl InkData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<u8>> for InkData {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Serialize for InkData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for InkData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Visible pan offset and zoom level into the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub zoom_scale: f64,
}

impl Viewport {
    /// Origin offset at 1x zoom.
    pub const DEFAULT: Self = Self {
        offset_x: 0.0,
        offset_y: 0.0,
        zoom_scale: 1.0,
    };

    pub fn new(offset_x: f64, offset_y: f64, zoom_scale: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            zoom_scale,
        }
    }

    /// Returns whether this viewport is close enough to the default that
    /// persisting it would only record scroll jitter.
    pub fn is_approximately_default(&self) -> bool {
        self.offset_x.abs() < VIEWPORT_OFFSET_TOLERANCE
            && self.offset_y.abs() < VIEWPORT_OFFSET_TOLERANCE
            && (self.zoom_scale - 1.0).abs() < VIEWPORT_ZOOM_TOLERANCE
    }

    fn is_finite(&self) -> bool {
        self.offset_x.is_finite() && self.offset_y.is_finite() && self.zoom_scale.is_finite()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Normalizes a viewport for persistence and dirty comparison.
///
/// Returns `None` for absent, approximately-default, or non-finite
/// viewports (JSON cannot represent NaN/inf), otherwise the exact triple.
pub fn normalize_viewport(viewport: Option<Viewport>) -> Option<Viewport> {
    viewport.filter(|value| value.is_finite() && !value.is_approximately_default())
}

/// Canonical persisted note record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// May be blank in memory; the editor substitutes a default on save.
    pub title: String,
    #[serde(default)]
    pub ink: InkData,
    /// Serialized as `backgroundPresetID` to match the document schema.
    #[serde(rename = "backgroundPresetID")]
    pub background_preset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Creates a blank, not-yet-persisted note with a generated id.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4(), now)
    }

    /// Creates a blank note with a caller-provided id.
    pub fn with_id(id: NoteId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: String::new(),
            ink: InkData::empty(),
            background_preset_id: BackgroundPreset::default().id().to_string(),
            viewport: None,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Resolved background preset; unknown ids fall back to the default.
    pub fn background_preset(&self) -> BackgroundPreset {
        BackgroundPreset::resolve(&self.background_preset_id)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
