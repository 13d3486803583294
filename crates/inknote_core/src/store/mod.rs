//! Note catalog store.
//!
//! # Responsibility
//! - Own the active and recently-deleted catalogs and their lifecycle.
//! - Write every mutation through to the storage backend.
//! - Notify explicit subscribers about effective mutations.
//!
//! # Invariants
//! - A note id lives in at most one catalog.
//! - `deleted_at` is `Some` exactly for recently-deleted notes.
//! - Active is sorted by `updated_at DESC, id ASC`; recently-deleted by
//!   `deleted_at DESC, id ASC`.

mod note_store;

pub use note_store::{
    format_default_title, NoteStore, StoreEvent, SubscriptionId, DEFAULT_DELETED_RETENTION,
};
