//! Navigation into the note editor.
//!
//! # Responsibility
//! - Model "open an existing note" vs "start a new note" as a tagged route.
//! - Resolve a route into an editor, or a "note missing" state when the
//!   referenced note is no longer active.

use crate::editor::autosave::{AutosaveConfig, AutosaveController};
use crate::model::note::{Note, NoteId};
use crate::storage::NoteStorage;
use crate::store::NoteStore;
use log::{debug, warn};

/// Target of an editor navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteRoute {
    /// Reference to a note in the active catalog.
    Existing(NoteId),
    /// Draft created in memory, not yet persisted.
    New(Note),
}

/// Top-level screens of the app.
#[derive(Debug, Clone, PartialEq)]
pub enum AppRoute {
    NoteList,
    RecentlyDeleted,
    Editor(NoteRoute),
}

/// Result of resolving a `NoteRoute`.
pub enum EditorScreen {
    Editing(AutosaveController),
    /// The referenced note was deleted or never existed.
    NoteMissing { id: NoteId },
}

impl EditorScreen {
    /// Route shown when the user leaves this screen.
    pub fn back_to_list(&self) -> AppRoute {
        AppRoute::NoteList
    }

    pub fn controller_mut(&mut self) -> Option<&mut AutosaveController> {
        match self {
            Self::Editing(controller) => Some(controller),
            Self::NoteMissing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NoteMissing { .. })
    }
}

/// Resolves `route` against the active catalog.
pub fn open_editor<S: NoteStorage>(
    store: &NoteStore<S>,
    route: NoteRoute,
    config: AutosaveConfig,
) -> EditorScreen {
    match route {
        NoteRoute::Existing(id) => match store.note_by_id(id) {
            Some(note) => {
                debug!("event=editor_open module=editor status=ok note_id={id} new=false");
                EditorScreen::Editing(AutosaveController::for_existing(
                    note,
                    store.clock(),
                    config,
                ))
            }
            None => {
                warn!("event=editor_open module=editor status=error note_id={id} error_code=note_missing");
                EditorScreen::NoteMissing { id }
            }
        },
        NoteRoute::New(note) => {
            debug!(
                "event=editor_open module=editor status=ok note_id={} new=true",
                note.id
            );
            EditorScreen::Editing(AutosaveController::for_new(&note, store.clock(), config))
        }
    }
}
