//! Drawing-surface collaborator contract and editor glue.
//!
//! # Responsibility
//! - Describe the narrow API core needs from the platform drawing canvas.
//! - Load a note's ink and viewport into a surface, and read them back.
//!
//! # Invariants
//! - Corrupt ink never propagates: the surface is cleared instead.
//! - Applied zoom always lies within the configured limits.

use crate::editor::autosave::{AutosaveController, SaveTicket};
use crate::model::note::Viewport;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_MIN_ZOOM: f64 = 0.5;
pub const DEFAULT_MAX_ZOOM: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// Surface could not decode the ink bytes.
    InvalidInk(String),
}

impl Display for CanvasError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInk(reason) => write!(f, "invalid ink data: {reason}"),
        }
    }
}

impl Error for CanvasError {}

/// Platform drawing canvas as seen by core.
///
/// Stroke change notifications are delivered by the host calling
/// `capture_canvas` (or `AutosaveController::set_ink`) after each stroke.
pub trait CanvasSurface {
    /// Serialized drawing currently on the surface.
    fn ink_bytes(&self) -> Vec<u8>;
    /// Replaces the drawing with deserialized `bytes`.
    fn load_ink(&mut self, bytes: &[u8]) -> Result<(), CanvasError>;
    /// Replaces the drawing with an empty one.
    fn clear_ink(&mut self);
    fn content_offset(&self) -> (f64, f64);
    fn set_content_offset(&mut self, x: f64, y: f64);
    fn zoom_scale(&self) -> f64;
    fn set_zoom_scale(&mut self, scale: f64);
    fn set_zoom_limits(&mut self, min: f64, max: f64);
    /// Asks the platform to show its tool picker.
    fn show_tool_picker(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Show the platform tool picker once the surface is attached.
    pub show_tool_picker: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            show_tool_picker: true,
        }
    }
}

impl CanvasConfig {
    /// Zoom limits ordered low-to-high; non-finite values use defaults.
    pub fn zoom_limits(&self) -> (f64, f64) {
        let min = finite_or(self.min_zoom, DEFAULT_MIN_ZOOM);
        let max = finite_or(self.max_zoom, DEFAULT_MAX_ZOOM);
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }

    pub fn clamp_zoom(&self, scale: f64) -> f64 {
        let (min, max) = self.zoom_limits();
        finite_or(scale, 1.0).clamp(min, max)
    }
}

/// How the note's ink ended up on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InkLoad {
    Loaded,
    /// Note had no ink.
    Blank,
    /// Stored ink was corrupt and was replaced by an empty drawing.
    Recovered,
}

/// Pushes the controller's note state into `surface`.
pub fn attach_canvas(
    surface: &mut impl CanvasSurface,
    controller: &AutosaveController,
    config: &CanvasConfig,
) -> InkLoad {
    let (min_zoom, max_zoom) = config.zoom_limits();
    surface.set_zoom_limits(min_zoom, max_zoom);

    let ink_load = if controller.ink().is_empty() {
        surface.clear_ink();
        InkLoad::Blank
    } else {
        match surface.load_ink(controller.ink().as_bytes()) {
            Ok(()) => InkLoad::Loaded,
            Err(err) => {
                warn!(
                    "event=canvas_attach module=canvas status=error note_id={} error_code=ink_decode_failed ink_bytes={} error={}",
                    controller.id(),
                    controller.ink().len(),
                    err
                );
                surface.clear_ink();
                InkLoad::Recovered
            }
        }
    };

    let viewport = controller.viewport().unwrap_or_default();
    surface.set_zoom_scale(config.clamp_zoom(viewport.zoom_scale));
    surface.set_content_offset(
        finite_or(viewport.offset_x, 0.0),
        finite_or(viewport.offset_y, 0.0),
    );

    if config.show_tool_picker {
        surface.show_tool_picker();
    }

    debug!(
        "event=canvas_attach module=canvas status=ok note_id={} ink={:?}",
        controller.id(),
        ink_load
    );
    ink_load
}

/// Reads ink and viewport back from `surface` into the controller.
///
/// Returns the autosave ticket armed by the last change, if the note is dirty.
pub fn capture_canvas(
    surface: &impl CanvasSurface,
    controller: &mut AutosaveController,
) -> Option<SaveTicket> {
    let ink = surface.ink_bytes();
    if ink.as_slice() != controller.ink().as_bytes() {
        controller.set_ink(ink);
    }

    let (offset_x, offset_y) = surface.content_offset();
    let viewport = Viewport::new(offset_x, offset_y, surface.zoom_scale());
    if controller.viewport() != Some(viewport) {
        controller.set_viewport(Some(viewport));
    }

    controller.pending_save()
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
