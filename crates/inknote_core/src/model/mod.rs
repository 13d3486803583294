//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record persisted by the store.
//! - Define the fixed background preset catalog.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Ink bytes are opaque to core and compared by exact equality only.

pub mod background;
pub mod note;
