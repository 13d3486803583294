//! Core domain logic for InkNote.
//! This crate is the single source of truth for note lifecycle and autosave
//! invariants.

pub mod clock;
pub mod editor;
pub mod logging;
pub mod model;
pub mod storage;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use editor::autosave::{
    AutosaveConfig, AutosaveController, DebounceTimer, SaveTicket, DEFAULT_QUIET_INTERVAL,
};
pub use editor::canvas::{
    attach_canvas, capture_canvas, CanvasConfig, CanvasError, CanvasSurface, InkLoad,
};
pub use editor::route::{open_editor, AppRoute, EditorScreen, NoteRoute};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::background::{Appearance, BackgroundPreset};
pub use model::note::{normalize_viewport, InkData, Note, NoteId, Viewport};
pub use storage::{JsonFileStorage, MemoryStorage, NoteStorage, StorageError, StorageResult};
pub use store::{
    format_default_title, NoteStore, StoreEvent, SubscriptionId, DEFAULT_DELETED_RETENTION,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
