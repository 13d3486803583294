use chrono::{DateTime, Duration, TimeZone, Utc};
use inknote_core::{
    format_default_title, AutosaveConfig, AutosaveController, Clock, InkData, ManualClock,
    MemoryStorage, Note, NoteStore, Viewport,
};
use std::sync::Arc;

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 14, 5, 0).unwrap()
}

struct Fixture {
    store: NoteStore<MemoryStorage>,
    storage: MemoryStorage,
    clock: Arc<ManualClock>,
}

fn fixture() -> Fixture {
    let storage = MemoryStorage::new();
    let clock = Arc::new(ManualClock::new(start_time()));
    let store = NoteStore::open(storage.clone(), clock.clone());
    Fixture {
        store,
        storage,
        clock,
    }
}

fn new_controller(fx: &Fixture) -> AutosaveController {
    let draft = fx.store.draft_note();
    AutosaveController::for_new(&draft, fx.store.clock(), AutosaveConfig::default())
}

fn existing_controller(fx: &mut Fixture, title: &str) -> AutosaveController {
    let mut note = Note::new(fx.clock.now());
    note.title = title.to_string();
    note.ink = InkData::new(vec![1, 2, 3]);
    fx.store.upsert(note.clone());
    AutosaveController::for_existing(&note, fx.store.clock(), AutosaveConfig::default())
}

#[test]
fn new_note_is_dirty_until_first_save() {
    let mut fx = fixture();
    let mut controller = new_controller(&fx);
    assert!(controller.is_new());
    assert!(controller.has_unsaved_changes());

    assert!(controller.save(&mut fx.store));
    assert!(!controller.is_new());
    assert!(!controller.has_unsaved_changes());
    assert!(fx.store.note_by_id(controller.id()).is_some());
}

#[test]
fn second_save_without_changes_is_a_no_op() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Plan");
    let writes = fx.storage.write_count();

    controller.set_title("Plan v2");
    assert!(controller.save(&mut fx.store));
    assert!(!controller.save(&mut fx.store));
    assert_eq!(fx.storage.write_count(), writes + 1);
}

#[test]
fn debounce_collapses_rapid_edits_into_one_write_with_last_values() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Draft");
    let writes = fx.storage.write_count();

    controller.set_title("D");
    fx.clock.advance(Duration::milliseconds(300));
    controller.set_ink(vec![9, 9]);
    fx.clock.advance(Duration::milliseconds(300));
    let ticket = controller.set_title("Diagram").unwrap();
    assert_eq!(ticket.due_at(), fx.clock.now() + Duration::milliseconds(800));

    fx.clock.advance(Duration::milliseconds(500));
    assert!(!controller.poll(&mut fx.store));
    assert_eq!(fx.storage.write_count(), writes);

    fx.clock.advance(Duration::milliseconds(300));
    assert!(controller.poll(&mut fx.store));
    assert_eq!(fx.storage.write_count(), writes + 1);
    assert!(!controller.poll(&mut fx.store));

    let saved = fx.store.note_by_id(controller.id()).unwrap();
    assert_eq!(saved.title, "Diagram");
    assert_eq!(saved.ink, InkData::new(vec![9, 9]));
    assert_eq!(saved.updated_at, fx.clock.now());
}

#[test]
fn superseded_ticket_does_not_fire() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Timer");

    let first = controller.set_title("Timer 1").unwrap();
    let second = controller.set_title("Timer 2").unwrap();

    assert!(!controller.fire(&mut fx.store, first));
    assert_eq!(fx.store.note_by_id(controller.id()).unwrap().title, "Timer");

    assert!(controller.fire(&mut fx.store, second));
    assert_eq!(fx.store.note_by_id(controller.id()).unwrap().title, "Timer 2");
    assert!(!controller.fire(&mut fx.store, second));
}

#[test]
fn edit_back_to_saved_value_cancels_pending_save() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Stable");

    assert!(controller.set_title("Stable!").is_some());
    assert!(controller.set_title("  Stable ").is_none());
    assert!(controller.pending_save().is_none());
    assert!(!controller.has_unsaved_changes());
}

#[test]
fn close_cancels_pending_timer_and_saves_immediately() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Closing");
    let writes = fx.storage.write_count();

    let ticket = controller.set_background("black").unwrap();
    assert!(controller.close(&mut fx.store));
    assert_eq!(fx.storage.write_count(), writes + 1);
    assert_eq!(
        fx.store.note_by_id(controller.id()).unwrap().background_preset_id,
        "black"
    );

    assert!(!controller.fire(&mut fx.store, ticket));
    assert!(!controller.close(&mut fx.store));
    assert_eq!(fx.storage.write_count(), writes + 1);
}

#[test]
fn blank_title_on_new_note_uses_default_title() {
    let mut fx = fixture();
    let mut controller = new_controller(&fx);
    controller.set_title("   ");

    controller.save(&mut fx.store);

    let expected = format_default_title(start_time());
    assert_eq!(fx.store.note_by_id(controller.id()).unwrap().title, expected);
    assert_eq!(controller.title(), expected);
    assert!(!controller.has_unsaved_changes());
}

#[test]
fn blank_title_on_existing_note_keeps_previous_title() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Keep me");

    controller.set_title("");
    assert!(controller.has_unsaved_changes());
    controller.save(&mut fx.store);

    assert_eq!(fx.store.note_by_id(controller.id()).unwrap().title, "Keep me");
    assert_eq!(controller.title(), "Keep me");
}

#[test]
fn blank_title_on_existing_untitled_note_falls_back_to_default() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "");
    controller.set_ink(vec![4, 5, 6]);
    fx.clock.advance(Duration::minutes(3));

    controller.save(&mut fx.store);

    assert_eq!(
        fx.store.note_by_id(controller.id()).unwrap().title,
        format_default_title(fx.clock.now())
    );
}

#[test]
fn title_is_trimmed_and_whitespace_only_changes_are_clean() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Trim");

    controller.set_title("  Trimmed title  ");
    controller.save(&mut fx.store);
    assert_eq!(
        fx.store.note_by_id(controller.id()).unwrap().title,
        "Trimmed title"
    );

    controller.set_title("Trimmed title   ");
    assert!(!controller.has_unsaved_changes());
}

#[test]
fn viewport_jitter_is_clean_and_real_scroll_is_saved_exactly() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Viewport");

    assert!(controller
        .set_viewport(Some(Viewport::new(0.2, -0.3, 1.004)))
        .is_none());
    assert!(!controller.has_unsaved_changes());

    let scrolled = Viewport::new(640.0, 1280.5, 1.75);
    assert!(controller.set_viewport(Some(scrolled)).is_some());
    controller.save(&mut fx.store);
    assert_eq!(
        fx.store.note_by_id(controller.id()).unwrap().viewport,
        Some(scrolled)
    );

    controller.set_viewport(Some(Viewport::new(0.1, 0.1, 1.0)));
    controller.save(&mut fx.store);
    assert_eq!(fx.store.note_by_id(controller.id()).unwrap().viewport, None);
}

#[test]
fn ink_change_is_detected_by_exact_bytes() {
    let mut fx = fixture();
    let mut controller = existing_controller(&mut fx, "Ink");

    assert!(controller.set_ink(vec![1, 2, 3]).is_none());
    assert!(controller.set_ink(vec![1, 2, 4]).is_some());
}

#[test]
fn custom_quiet_interval_is_respected() {
    let mut fx = fixture();
    let draft = fx.store.draft_note();
    let config = AutosaveConfig {
        quiet_interval: std::time::Duration::from_secs(2),
    };
    let mut controller = AutosaveController::for_new(&draft, fx.store.clock(), config);

    let ticket = controller.set_title("Slow").unwrap();
    assert_eq!(ticket.delay_from(fx.clock.now()).as_secs(), 2);
    fx.clock.advance(Duration::milliseconds(1_999));
    assert!(!controller.poll(&mut fx.store));
    fx.clock.advance(Duration::milliseconds(1));
    assert!(controller.poll(&mut fx.store));
}

#[test]
fn oversized_quiet_interval_never_comes_due() {
    let mut fx = fixture();
    let draft = fx.store.draft_note();
    let config = AutosaveConfig {
        quiet_interval: std::time::Duration::MAX,
    };
    let mut controller = AutosaveController::for_new(&draft, fx.store.clock(), config);

    let ticket = controller.set_title("Someday").unwrap();
    assert_eq!(ticket.due_at(), DateTime::<Utc>::MAX_UTC);
    fx.clock.advance(Duration::days(365));
    assert!(!controller.poll(&mut fx.store));

    assert!(controller.close(&mut fx.store));
    assert_eq!(fx.store.notes()[0].title, "Someday");
}

#[test]
fn empty_new_note_survives_reload_with_default_title_and_blank_ink() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(start_time()));
    let mut store = NoteStore::open(
        inknote_core::JsonFileStorage::in_dir(dir.path()),
        clock.clone(),
    );
    let draft = store.draft_note();
    let mut controller =
        AutosaveController::for_new(&draft, store.clock(), AutosaveConfig::default());
    controller.set_title("");
    assert!(controller.close(&mut store));

    let reloaded = NoteStore::open(inknote_core::JsonFileStorage::in_dir(dir.path()), clock);
    let note = reloaded.note_by_id(draft.id).unwrap();
    assert_eq!(note.title, format_default_title(start_time()));
    assert!(note.ink.is_empty());
    assert_eq!(note.viewport, None);
}
