//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose note list, editor and trash use-cases to Dart via FRB.
//! - Own one note store and at most one open editor per session handle.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Opening another note (or a new one) first closes and saves the current
//!   one.
//! - Timestamps cross the boundary as epoch milliseconds.

use inknote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_editor,
    ping as ping_inner, AutosaveConfig, AutosaveController, EditorScreen, JsonFileStorage, Note,
    NoteId, NoteRoute, NoteStore, SaveTicket, SystemClock, Viewport,
};
use log::info;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

const DATA_DIR_ENV: &str = "INKNOTE_DATA_DIR";
const DEFAULT_DATA_DIR_NAME: &str = "inknote";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Viewport triple as seen by Dart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FfiViewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub zoom_scale: f64,
}

/// Row for the note list and recently-deleted screens.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSummary {
    pub note_id: String,
    pub title: String,
    pub background_preset_id: String,
    pub updated_at_ms: i64,
    /// Set only for recently-deleted rows.
    pub deleted_at_ms: Option<i64>,
}

/// Working state of the open note.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub note_id: String,
    pub title: String,
    pub ink: Vec<u8>,
    pub background_preset_id: String,
    pub viewport: Option<FfiViewport>,
    pub is_new: bool,
    pub has_unsaved_changes: bool,
}

/// Result of opening a note or starting a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenNoteResponse {
    pub ok: bool,
    /// Note id no longer resolves; Dart shows the fallback with a way back.
    pub missing: bool,
    pub editor: Option<EditorSnapshot>,
    pub message: String,
}

impl OpenNoteResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            missing: false,
            editor: None,
            message: message.into(),
        }
    }
}

/// Result of one edit on the open note.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResponse {
    pub ok: bool,
    pub has_unsaved_changes: bool,
    /// When set, Dart should call `poll_autosave` after this many ms.
    pub autosave_delay_ms: Option<u64>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

struct SessionState {
    store: NoteStore<JsonFileStorage>,
    editor: Option<AutosaveController>,
    autosave: AutosaveConfig,
}

impl SessionState {
    fn close_editor(&mut self) -> bool {
        match self.editor.take() {
            Some(mut controller) => controller.close(&mut self.store),
            None => false,
        }
    }
}

/// One app session: the note store plus the currently open editor.
#[flutter_rust_bridge::frb(opaque)]
pub struct NotesSession {
    state: Mutex<SessionState>,
}

impl NotesSession {
    /// Loads the store from `data_dir` (see `resolve_data_dir`).
    ///
    /// # FFI contract
    /// - Never fails: unreadable documents load as an empty store.
    #[flutter_rust_bridge::frb(sync)]
    pub fn new(data_dir: String) -> Self {
        let dir = resolve_data_dir(&data_dir);
        info!(
            "event=session_open module=ffi status=start data_dir={}",
            dir.display()
        );
        let store = NoteStore::open(JsonFileStorage::in_dir(&dir), Arc::new(SystemClock));
        Self {
            state: Mutex::new(SessionState {
                store,
                editor: None,
                autosave: AutosaveConfig::default(),
            }),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn list_notes(&self) -> Vec<NoteSummary> {
        self.lock().store.notes().iter().map(to_summary).collect()
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn list_recently_deleted(&self) -> Vec<NoteSummary> {
        self.lock()
            .store
            .recently_deleted()
            .iter()
            .map(to_summary)
            .collect()
    }

    /// Starts a new, unsaved note. It is persisted on its first autosave.
    #[flutter_rust_bridge::frb(sync)]
    pub fn new_note(&self) -> OpenNoteResponse {
        let mut state = self.lock();
        state.close_editor();
        let draft = state.store.draft_note();
        let screen = open_editor(&state.store, NoteRoute::New(draft), state.autosave);
        install_editor(&mut state, screen)
    }

    /// Opens an active note by id.
    #[flutter_rust_bridge::frb(sync)]
    pub fn open_note(&self, note_id: String) -> OpenNoteResponse {
        let id = match parse_note_id(&note_id) {
            Ok(id) => id,
            Err(message) => return OpenNoteResponse::failure(message),
        };

        let mut state = self.lock();
        state.close_editor();
        let screen = open_editor(&state.store, NoteRoute::Existing(id), state.autosave);
        install_editor(&mut state, screen)
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn set_title(&self, title: String) -> EditResponse {
        self.edit(|controller| controller.set_title(title))
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn set_ink(&self, ink: Vec<u8>) -> EditResponse {
        self.edit(|controller| controller.set_ink(ink))
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn set_background(&self, preset_id: String) -> EditResponse {
        self.edit(|controller| controller.set_background(preset_id))
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn set_viewport(&self, offset_x: f64, offset_y: f64, zoom_scale: f64) -> EditResponse {
        self.edit(|controller| {
            controller.set_viewport(Some(Viewport::new(offset_x, offset_y, zoom_scale)))
        })
    }

    /// Runs a due autosave. Returns whether a save happened.
    #[flutter_rust_bridge::frb(sync)]
    pub fn poll_autosave(&self) -> bool {
        let mut state = self.lock();
        let SessionState { store, editor, .. } = &mut *state;
        match editor.as_mut() {
            Some(controller) => controller.poll(store),
            None => false,
        }
    }

    /// Leaves the editor, saving immediately if dirty.
    #[flutter_rust_bridge::frb(sync)]
    pub fn close_note(&self) -> bool {
        self.lock().close_editor()
    }

    /// Moves a note to recently-deleted. Closes it first if it is open.
    #[flutter_rust_bridge::frb(sync)]
    pub fn delete_note(&self, note_id: String) -> ActionResponse {
        let id = match parse_note_id(&note_id) {
            Ok(id) => id,
            Err(message) => return ActionResponse::failure(message),
        };

        let mut state = self.lock();
        if state.editor.as_ref().map(AutosaveController::id) == Some(id) {
            state.close_editor();
        }
        if state.store.delete(id) {
            ActionResponse::success("Note moved to Recently Deleted.")
        } else {
            ActionResponse::failure(format!("note not found: {id}"))
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn restore_note(&self, note_id: String) -> ActionResponse {
        let id = match parse_note_id(&note_id) {
            Ok(id) => id,
            Err(message) => return ActionResponse::failure(message),
        };

        if self.lock().store.restore(id) {
            ActionResponse::success("Note restored.")
        } else {
            ActionResponse::failure(format!("deleted note not found: {id}"))
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn permanently_delete_note(&self, note_id: String) -> ActionResponse {
        let id = match parse_note_id(&note_id) {
            Ok(id) => id,
            Err(message) => return ActionResponse::failure(message),
        };

        if self.lock().store.permanently_delete(id) {
            ActionResponse::success("Note deleted permanently.")
        } else {
            ActionResponse::failure(format!("deleted note not found: {id}"))
        }
    }

    /// Permanently removes every recently-deleted note. Returns the count.
    #[flutter_rust_bridge::frb(sync)]
    pub fn empty_recently_deleted(&self) -> u32 {
        saturating_u32(self.lock().store.empty_recently_deleted())
    }

    /// Removes notes deleted more than `retention_days` ago. Returns the count.
    #[flutter_rust_bridge::frb(sync)]
    pub fn purge_expired(&self, retention_days: u32) -> u32 {
        let retention = Duration::from_secs(u64::from(retention_days) * SECONDS_PER_DAY);
        saturating_u32(self.lock().store.purge_expired(retention))
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn default_title(&self) -> String {
        self.lock().store.default_title()
    }

    /// Last write failure, for the diagnostics screen only.
    #[flutter_rust_bridge::frb(sync)]
    pub fn last_persist_error(&self) -> Option<String> {
        self.lock().store.last_persist_error().map(str::to_owned)
    }

    fn edit(
        &self,
        apply: impl FnOnce(&mut AutosaveController) -> Option<SaveTicket>,
    ) -> EditResponse {
        let mut state = self.lock();
        let SessionState { store, editor, .. } = &mut *state;
        let Some(controller) = editor.as_mut() else {
            return EditResponse {
                ok: false,
                has_unsaved_changes: false,
                autosave_delay_ms: None,
                message: "no note is open".to_string(),
            };
        };

        let ticket = apply(controller);
        let now = store.now();
        EditResponse {
            ok: true,
            has_unsaved_changes: controller.has_unsaved_changes(),
            autosave_delay_ms: ticket.map(|ticket| duration_ms(ticket.delay_from(now))),
            message: String::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves the directory holding `notes.json`.
///
/// Order: explicit non-blank argument, then `INKNOTE_DATA_DIR`, then
/// `<temp>/inknote`.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    let trimmed = data_dir.trim();
    if !trimmed.is_empty() {
        return PathBuf::from(trimmed);
    }
    if let Ok(raw) = std::env::var(DATA_DIR_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME)
}

fn install_editor(state: &mut SessionState, screen: EditorScreen) -> OpenNoteResponse {
    match screen {
        EditorScreen::Editing(controller) => {
            let snapshot = to_editor_snapshot(&controller);
            state.editor = Some(controller);
            OpenNoteResponse {
                ok: true,
                missing: false,
                editor: Some(snapshot),
                message: String::new(),
            }
        }
        EditorScreen::NoteMissing { id } => OpenNoteResponse {
            ok: false,
            missing: true,
            editor: None,
            message: format!("note not found: {id}"),
        },
    }
}

fn parse_note_id(value: &str) -> Result<NoteId, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("invalid note id `{value}`"))
}

fn to_summary(note: &Note) -> NoteSummary {
    NoteSummary {
        note_id: note.id.to_string(),
        title: note.title.clone(),
        background_preset_id: note.background_preset_id.clone(),
        updated_at_ms: note.updated_at.timestamp_millis(),
        deleted_at_ms: note.deleted_at.map(|value| value.timestamp_millis()),
    }
}

fn to_editor_snapshot(controller: &AutosaveController) -> EditorSnapshot {
    EditorSnapshot {
        note_id: controller.id().to_string(),
        title: controller.title().to_string(),
        ink: controller.ink().as_bytes().to_vec(),
        background_preset_id: controller.background_preset_id().to_string(),
        viewport: controller.viewport().map(|viewport| FfiViewport {
            offset_x: viewport.offset_x,
            offset_y: viewport.offset_y,
            zoom_scale: viewport.zoom_scale,
        }),
        is_new: controller.is_new(),
        has_unsaved_changes: controller.has_unsaved_changes(),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
