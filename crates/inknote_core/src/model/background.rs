//! Background preset catalog.
//!
//! # Responsibility
//! - Enumerate the fixed page backgrounds a note can use.
//! - Map persisted preset ids to presets, falling back to the default.
//!
//! # Invariants
//! - Preset ids are stable wire values and must never be renamed.
//! - Unknown ids are preserved in storage and only resolved on read.

/// Light/dark hint the UI uses to pick contrasting chrome and ink colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Light,
    Dark,
}

/// Fixed page background choice for a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackgroundPreset {
    #[default]
    White,
    Cream,
    Gray,
    Black,
}

impl BackgroundPreset {
    /// All presets in picker order.
    pub const ALL: [Self; 4] = [Self::White, Self::Cream, Self::Gray, Self::Black];

    /// Stable id stored in `backgroundPresetID`.
    pub fn id(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Cream => "cream",
            Self::Gray => "gray",
            Self::Black => "black",
        }
    }

    /// Parses a persisted preset id. Matching is exact.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.id() == id)
    }

    /// Resolves a persisted id, using the default preset for unknown values.
    pub fn resolve(id: &str) -> Self {
        Self::from_id(id).unwrap_or_default()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Cream => "Cream",
            Self::Gray => "Gray",
            Self::Black => "Black",
        }
    }

    /// Page color as 8-bit RGB.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::White => (0xFF, 0xFF, 0xFF),
            Self::Cream => (0xFA, 0xF3, 0xE0),
            Self::Gray => (0xE5, 0xE5, 0xEA),
            Self::Black => (0x1C, 0x1C, 0x1E),
        }
    }

    pub fn appearance(self) -> Appearance {
        match self {
            Self::Black => Appearance::Dark,
            Self::White | Self::Cream | Self::Gray => Appearance::Light,
        }
    }
}
