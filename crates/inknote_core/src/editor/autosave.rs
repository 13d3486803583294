//! Dirty tracking and debounced autosave for one open note.
//!
//! # Responsibility
//! - Hold working copies of the editable note fields next to a snapshot of
//!   what was last saved.
//! - Arm a trailing-edge debounce on every change while dirty.
//! - Build the saved `Note` (title fallback, viewport normalization) and
//!   upsert it.
//!
//! # Invariants
//! - Arming always invalidates the previously issued `SaveTicket`.
//! - A fired ticket only saves if it is still the pending one.
//! - After a save, working fields and snapshot agree, so the note is clean.

use crate::clock::Clock;
use crate::model::note::{normalize_viewport, InkData, Note, NoteId, Viewport};
use crate::storage::NoteStorage;
use crate::store::NoteStore;
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Quiet period after the last edit before an autosave fires.
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub quiet_interval: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiet_interval: DEFAULT_QUIET_INTERVAL,
        }
    }
}

/// Token for one armed autosave.
///
/// Hosts that drive saves from a platform timer schedule it for
/// `delay_from(now)` and hand the ticket back to `AutosaveController::fire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    generation: u64,
    due_at: DateTime<Utc>,
}

impl SaveTicket {
    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// Remaining wait from `now`; zero once due.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.due_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Cancellable single-slot deferred action.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    generation: u64,
    pending: Option<SaveTicket>,
}

impl DebounceTimer {
    /// Arms the timer, replacing any outstanding ticket.
    pub fn arm(&mut self, due_at: DateTime<Utc>) -> SaveTicket {
        self.generation = self.generation.wrapping_add(1);
        let ticket = SaveTicket {
            generation: self.generation,
            due_at,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Cancels the outstanding ticket. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn pending(&self) -> Option<SaveTicket> {
        self.pending
    }

    /// Consumes `ticket` if it is still the pending one.
    pub fn take_if_current(&mut self, ticket: SaveTicket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Consumes the pending ticket if it is due at `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<SaveTicket> {
        match self.pending {
            Some(ticket) if ticket.due_at <= now => self.pending.take(),
            _ => None,
        }
    }
}

/// Field values as of the last successful save.
#[derive(Debug, Clone, PartialEq)]
struct SavedSnapshot {
    title: String,
    background_preset_id: String,
    ink: InkData,
    viewport: Option<Viewport>,
}

impl SavedSnapshot {
    fn of(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            background_preset_id: note.background_preset_id.clone(),
            ink: note.ink.clone(),
            viewport: normalize_viewport(note.viewport),
        }
    }
}

/// Autosave view-model for one open note.
pub struct AutosaveController {
    id: NoteId,
    title: String,
    ink: InkData,
    background_preset_id: String,
    viewport: Option<Viewport>,
    saved: SavedSnapshot,
    is_new: bool,
    timer: DebounceTimer,
    config: AutosaveConfig,
    clock: Arc<dyn Clock>,
}

impl AutosaveController {
    /// Opens a note already present in the store.
    pub fn for_existing(note: &Note, clock: Arc<dyn Clock>, config: AutosaveConfig) -> Self {
        Self::from_note(note, false, clock, config)
    }

    /// Opens a draft that has never been saved; it stays dirty until saved.
    pub fn for_new(note: &Note, clock: Arc<dyn Clock>, config: AutosaveConfig) -> Self {
        Self::from_note(note, true, clock, config)
    }

    fn from_note(note: &Note, is_new: bool, clock: Arc<dyn Clock>, config: AutosaveConfig) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            ink: note.ink.clone(),
            background_preset_id: note.background_preset_id.clone(),
            viewport: note.viewport,
            saved: SavedSnapshot::of(note),
            is_new,
            timer: DebounceTimer::default(),
            config,
            clock,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ink(&self) -> &InkData {
        &self.ink
    }

    pub fn background_preset_id(&self) -> &str {
        &self.background_preset_id
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn pending_save(&self) -> Option<SaveTicket> {
        self.timer.pending()
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Option<SaveTicket> {
        self.title = title.into();
        self.reschedule()
    }

    pub fn set_ink(&mut self, ink: impl Into<InkData>) -> Option<SaveTicket> {
        self.ink = ink.into();
        self.reschedule()
    }

    pub fn set_background(&mut self, preset_id: impl Into<String>) -> Option<SaveTicket> {
        self.background_preset_id = preset_id.into();
        self.reschedule()
    }

    pub fn set_viewport(&mut self, viewport: Option<Viewport>) -> Option<SaveTicket> {
        self.viewport = viewport;
        self.reschedule()
    }

    /// Whether the working fields differ from the last saved snapshot.
    pub fn has_unsaved_changes(&self) -> bool {
        self.is_new
            || self.title.trim() != self.saved.title.trim()
            || self.background_preset_id != self.saved.background_preset_id
            || self.ink != self.saved.ink
            || normalize_viewport(self.viewport) != self.saved.viewport
    }

    /// Runs the save for a platform-timer callback.
    ///
    /// Stale tickets (cancelled or superseded) are ignored.
    pub fn fire<S: NoteStorage>(&mut self, store: &mut NoteStore<S>, ticket: SaveTicket) -> bool {
        if !self.timer.take_if_current(ticket) {
            debug!(
                "event=autosave_fire module=editor status=skip note_id={} reason=stale_ticket",
                self.id
            );
            return false;
        }
        self.save(store)
    }

    /// Runs the pending save if its quiet interval has elapsed.
    pub fn poll<S: NoteStorage>(&mut self, store: &mut NoteStore<S>) -> bool {
        match self.timer.take_due(self.clock.now()) {
            Some(_) => self.save(store),
            None => false,
        }
    }

    /// Cancels any pending autosave and saves immediately.
    pub fn close<S: NoteStorage>(&mut self, store: &mut NoteStore<S>) -> bool {
        self.timer.cancel();
        self.save(store)
    }

    /// Saves the note if dirty. Returns whether an upsert happened.
    pub fn save<S: NoteStorage>(&mut self, store: &mut NoteStore<S>) -> bool {
        if !self.has_unsaved_changes() {
            debug!(
                "event=autosave_save module=editor status=skip note_id={} reason=clean",
                self.id
            );
            return false;
        }

        self.timer.cancel();
        let note = Note {
            id: self.id,
            title: self.resolve_title(store),
            ink: self.ink.clone(),
            background_preset_id: self.background_preset_id.clone(),
            viewport: normalize_viewport(self.viewport),
            updated_at: self.clock.now(),
            deleted_at: None,
        };

        self.title = note.title.clone();
        self.saved = SavedSnapshot::of(&note);
        let was_new = std::mem::replace(&mut self.is_new, false);
        debug!(
            "event=autosave_save module=editor status=ok note_id={} new={} ink_bytes={}",
            self.id,
            was_new,
            note.ink.len()
        );
        store.upsert(note);
        true
    }

    fn resolve_title<S: NoteStorage>(&self, store: &NoteStore<S>) -> String {
        let trimmed = self.title.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
        if !self.is_new {
            let previous = self.saved.title.trim();
            if !previous.is_empty() {
                return previous.to_string();
            }
        }
        store.default_title()
    }

    fn reschedule(&mut self) -> Option<SaveTicket> {
        self.timer.cancel();
        if !self.has_unsaved_changes() {
            return None;
        }

        Some(
            self.timer
                .arm(quiet_deadline(self.clock.now(), self.config.quiet_interval)),
        )
    }
}

/// `now + interval`, saturating at the latest representable instant.
fn quiet_deadline(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::{quiet_deadline, DebounceTimer};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    #[test]
    fn rearming_invalidates_previous_ticket() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut timer = DebounceTimer::default();
        let first = timer.arm(at);
        let second = timer.arm(at);

        assert_ne!(first, second);
        assert!(!timer.take_if_current(first));
        assert!(timer.take_if_current(second));
        assert!(timer.pending().is_none());
    }

    #[test]
    fn cancelled_ticket_is_not_current() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut timer = DebounceTimer::default();
        let ticket = timer.arm(at);
        assert!(timer.cancel());
        assert!(!timer.take_if_current(ticket));
        assert!(!timer.cancel());
    }

    #[test]
    fn take_due_waits_for_deadline() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut timer = DebounceTimer::default();
        let ticket = timer.arm(at + Duration::milliseconds(800));

        assert_eq!(timer.take_due(at + Duration::milliseconds(799)), None);
        assert_eq!(ticket.delay_from(at).as_millis(), 800);
        assert_eq!(timer.take_due(at + Duration::milliseconds(800)), Some(ticket));
        assert_eq!(timer.take_due(at + Duration::seconds(5)), None);
    }

    #[test]
    fn quiet_deadline_saturates_instead_of_overflowing() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            quiet_deadline(at, std::time::Duration::from_millis(800)),
            at + Duration::milliseconds(800)
        );
        assert_eq!(
            quiet_deadline(at, std::time::Duration::from_secs(10_000_000_000_000)),
            DateTime::<Utc>::MAX_UTC
        );
        assert_eq!(
            quiet_deadline(at, std::time::Duration::MAX),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
