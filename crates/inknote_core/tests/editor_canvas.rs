use chrono::{TimeZone, Utc};
use inknote_core::{
    attach_canvas, capture_canvas, open_editor, AppRoute, AutosaveConfig, CanvasConfig,
    CanvasError, CanvasSurface, EditorScreen, InkData, InkLoad, ManualClock, MemoryStorage, Note,
    NoteRoute, NoteStore, Viewport,
};
use std::sync::Arc;
use uuid::Uuid;

const VALID_INK_PREFIX: &[u8] = b"INK1";

#[derive(Debug, Default)]
struct FakeSurface {
    ink: Vec<u8>,
    offset: (f64, f64),
    zoom: f64,
    zoom_limits: Option<(f64, f64)>,
    tool_picker_shown: bool,
}

impl CanvasSurface for FakeSurface {
    fn ink_bytes(&self) -> Vec<u8> {
        self.ink.clone()
    }

    fn load_ink(&mut self, bytes: &[u8]) -> Result<(), CanvasError> {
        if !bytes.starts_with(VALID_INK_PREFIX) {
            return Err(CanvasError::InvalidInk("missing header".to_string()));
        }
        self.ink = bytes.to_vec();
        Ok(())
    }

    fn clear_ink(&mut self) {
        self.ink.clear();
    }

    fn content_offset(&self) -> (f64, f64) {
        self.offset
    }

    fn set_content_offset(&mut self, x: f64, y: f64) {
        self.offset = (x, y);
    }

    fn zoom_scale(&self) -> f64 {
        self.zoom
    }

    fn set_zoom_scale(&mut self, scale: f64) {
        self.zoom = scale;
    }

    fn set_zoom_limits(&mut self, min: f64, max: f64) {
        self.zoom_limits = Some((min, max));
    }

    fn show_tool_picker(&mut self) {
        self.tool_picker_shown = true;
    }
}

fn store() -> NoteStore<MemoryStorage> {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 7, 7, 7, 7, 0).unwrap(),
    ));
    NoteStore::open(MemoryStorage::new(), clock)
}

fn stored_note(store: &mut NoteStore<MemoryStorage>, ink: &[u8], viewport: Option<Viewport>) -> Note {
    let mut note = store.draft_note();
    note.title = "Canvas".to_string();
    note.ink = InkData::new(ink.to_vec());
    note.viewport = viewport;
    store.upsert(note.clone());
    note
}

#[test]
fn existing_route_opens_editor_for_active_note() {
    let mut store = store();
    let note = stored_note(&mut store, b"INK1 strokes", None);

    let mut screen = open_editor(&store, NoteRoute::Existing(note.id), AutosaveConfig::default());
    let controller = screen.controller_mut().unwrap();
    assert_eq!(controller.id(), note.id);
    assert!(!controller.is_new());
    assert!(!controller.has_unsaved_changes());
}

#[test]
fn new_route_opens_unsaved_draft() {
    let mut store = store();
    let draft = store.draft_note();

    let mut screen = open_editor(&store, NoteRoute::New(draft.clone()), AutosaveConfig::default());
    let controller = screen.controller_mut().unwrap();
    assert!(controller.is_new());
    assert!(store.note_by_id(draft.id).is_none());

    controller.close(&mut store);
    assert!(store.note_by_id(draft.id).is_some());
}

#[test]
fn stale_reference_yields_note_missing_with_path_back() {
    let mut store = store();
    let note = stored_note(&mut store, b"", None);
    store.delete(note.id);

    let mut screen = open_editor(&store, NoteRoute::Existing(note.id), AutosaveConfig::default());
    assert!(screen.is_missing());
    assert!(screen.controller_mut().is_none());
    assert_eq!(screen.back_to_list(), AppRoute::NoteList);
    match screen {
        EditorScreen::NoteMissing { id } => assert_eq!(id, note.id),
        EditorScreen::Editing(_) => panic!("deleted note must not open"),
    }

    let unknown = open_editor(
        &store,
        NoteRoute::Existing(Uuid::new_v4()),
        AutosaveConfig::default(),
    );
    assert!(unknown.is_missing());
}

#[test]
fn attach_loads_ink_viewport_and_limits() {
    let mut store = store();
    let viewport = Viewport::new(120.0, 300.0, 2.5);
    let note = stored_note(&mut store, b"INK1 strokes", Some(viewport));
    let mut screen = open_editor(&store, NoteRoute::Existing(note.id), AutosaveConfig::default());
    let controller = screen.controller_mut().unwrap();

    let mut surface = FakeSurface::default();
    let outcome = attach_canvas(&mut surface, controller, &CanvasConfig::default());

    assert_eq!(outcome, InkLoad::Loaded);
    assert_eq!(surface.ink, b"INK1 strokes");
    assert_eq!(surface.offset, (120.0, 300.0));
    assert_eq!(surface.zoom, 2.5);
    assert_eq!(surface.zoom_limits, Some((0.5, 4.0)));
    assert!(surface.tool_picker_shown);
}

#[test]
fn attach_recovers_from_corrupt_ink_and_clamps_zoom() {
    let mut store = store();
    let note = stored_note(&mut store, b"garbage", Some(Viewport::new(0.0, 0.0, 9.0)));
    let mut screen = open_editor(&store, NoteRoute::Existing(note.id), AutosaveConfig::default());
    let controller = screen.controller_mut().unwrap();

    let mut surface = FakeSurface {
        ink: b"INK1 previous note".to_vec(),
        ..FakeSurface::default()
    };
    let config = CanvasConfig {
        show_tool_picker: false,
        ..CanvasConfig::default()
    };
    let outcome = attach_canvas(&mut surface, controller, &config);

    assert_eq!(outcome, InkLoad::Recovered);
    assert!(surface.ink.is_empty());
    assert_eq!(surface.zoom, 4.0);
    assert!(!surface.tool_picker_shown);
    assert!(!controller.has_unsaved_changes());
}

#[test]
fn attach_blank_note_uses_default_viewport() {
    let mut store = store();
    let draft = store.draft_note();
    let mut screen = open_editor(&store, NoteRoute::New(draft), AutosaveConfig::default());
    let controller = screen.controller_mut().unwrap();

    let mut surface = FakeSurface {
        ink: b"INK1 leftover".to_vec(),
        offset: (50.0, 50.0),
        zoom: 3.0,
        ..FakeSurface::default()
    };
    assert_eq!(
        attach_canvas(&mut surface, controller, &CanvasConfig::default()),
        InkLoad::Blank
    );
    assert!(surface.ink.is_empty());
    assert_eq!(surface.offset, (0.0, 0.0));
    assert_eq!(surface.zoom, 1.0);
}

#[test]
fn capture_feeds_strokes_and_scroll_into_autosave() {
    let mut store = store();
    let note = stored_note(&mut store, b"INK1 a", None);
    let mut screen = open_editor(&store, NoteRoute::Existing(note.id), AutosaveConfig::default());
    let controller = screen.controller_mut().unwrap();
    let mut surface = FakeSurface::default();
    attach_canvas(&mut surface, controller, &CanvasConfig::default());

    assert!(capture_canvas(&surface, controller).is_none());

    surface.ink = b"INK1 a b".to_vec();
    surface.offset = (10.0, 900.0);
    surface.zoom = 1.5;
    let ticket = capture_canvas(&surface, controller).unwrap();
    assert_eq!(controller.pending_save(), Some(ticket));

    assert!(controller.fire(&mut store, ticket));
    let saved = store.note_by_id(note.id).unwrap();
    assert_eq!(saved.ink, InkData::new(b"INK1 a b".to_vec()));
    assert_eq!(saved.viewport, Some(Viewport::new(10.0, 900.0, 1.5)));
}
