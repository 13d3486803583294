//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `inknote_core` linkage.
//! - Optionally summarize a `notes.json` document without touching the app.
//!
//! Usage: `inknote_cli [path/to/notes.json]`

use inknote_core::{JsonFileStorage, Note, NoteStore, SystemClock};
use std::sync::Arc;

fn main() {
    println!("inknote_core ping={}", inknote_core::ping());
    println!("inknote_core version={}", inknote_core::core_version());

    let Some(path) = std::env::args_os().nth(1) else {
        return;
    };

    // Loading never fails; unreadable documents show up as an empty store.
    let store = NoteStore::open(JsonFileStorage::new(path), Arc::new(SystemClock));
    println!(
        "notes={} recently_deleted={}",
        store.notes().len(),
        store.recently_deleted().len()
    );
    for note in store.notes() {
        println!("{}", describe(note));
    }
    for note in store.recently_deleted() {
        println!("{} [deleted]", describe(note));
    }
}

fn describe(note: &Note) -> String {
    format!(
        "{} {} title={:?} background={} ink_bytes={}",
        note.id,
        note.updated_at.to_rfc3339(),
        note.title,
        note.background_preset().id(),
        note.ink.len()
    )
}
