//! Per-note editor logic.
//!
//! # Responsibility
//! - Track unsaved edits of one open note and flush them through a debounced
//!   autosave.
//! - Resolve navigation routes into an editor or a "note missing" state.
//! - Bridge the platform drawing surface to the editor state.
//!
//! # Invariants
//! - At most one autosave is pending per open note.
//! - A save never runs when the dirty check reports no changes.

pub mod autosave;
pub mod canvas;
pub mod route;
