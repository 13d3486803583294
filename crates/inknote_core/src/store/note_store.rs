//! In-memory note store with write-through JSON persistence.

use crate::clock::Clock;
use crate::model::note::{Note, NoteId};
use crate::storage::document::{decode_document, encode_document, DocumentShape, StoreDocument};
use crate::storage::NoteStorage;
use chrono::{DateTime, Local, Utc};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long recently-deleted notes are kept by `purge_expired` callers that
/// use the default retention.
pub const DEFAULT_DELETED_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const DEFAULT_TITLE_FORMAT: &str = "%b %-d, %Y at %-I:%M %p";

/// Effective mutation notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Upserted(NoteId),
    Deleted(NoteId),
    Restored(NoteId),
    PermanentlyDeleted(NoteId),
    /// Several recently-deleted notes were removed at once.
    Purged { count: usize },
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StoreEvent) + Send>;

/// Sole owner of note lifecycle and persisted storage.
///
/// Constructed once by the host and passed by reference to consumers.
pub struct NoteStore<S: NoteStorage> {
    storage: S,
    clock: Arc<dyn Clock>,
    notes: Vec<Note>,
    recently_deleted: Vec<Note>,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
    next_subscription: u64,
    last_persist_error: Option<String>,
}

impl<S: NoteStorage> NoteStore<S> {
    /// Loads the store from `storage`.
    ///
    /// Never fails: an absent, unreadable, or undecodable document yields
    /// empty catalogs. A legacy flat-list document is migrated and rewritten
    /// in the current shape right away.
    pub fn open(storage: S, clock: Arc<dyn Clock>) -> Self {
        let started_at = Instant::now();
        info!(
            "event=store_load module=store status=start mode={}",
            storage.mode()
        );

        let (document, shape) = load_document(&storage);
        let (notes, recently_deleted) = normalize_catalogs(document);

        let mut store = Self {
            storage,
            clock,
            notes,
            recently_deleted,
            subscribers: BTreeMap::new(),
            next_subscription: 0,
            last_persist_error: None,
        };

        info!(
            "event=store_load module=store status=ok mode={} shape={} notes={} deleted={} duration_ms={}",
            store.storage.mode(),
            shape.map_or("none", DocumentShape::label),
            store.notes.len(),
            store.recently_deleted.len(),
            started_at.elapsed().as_millis()
        );

        if shape == Some(DocumentShape::LegacyFlatList) {
            info!("event=store_migrate module=store status=start from=legacy_flat_list");
            store.persist();
        }

        store
    }

    /// Active notes, most recently updated first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Soft-deleted notes, most recently deleted first.
    pub fn recently_deleted(&self) -> &[Note] {
        &self.recently_deleted
    }

    /// Looks up an active note. Recently-deleted notes are not resolvable.
    pub fn note_by_id(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Looks up a note in recently-deleted only.
    pub fn deleted_note_by_id(&self, id: NoteId) -> Option<&Note> {
        self.recently_deleted.iter().find(|note| note.id == id)
    }

    /// Default title for the current local date/time.
    pub fn default_title(&self) -> String {
        format_default_title(self.clock.now())
    }

    /// Creates an unsaved note; it enters the store on its first `upsert`.
    pub fn draft_note(&self) -> Note {
        Note::new(self.clock.now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Message of the last failed write, cleared by the next successful one.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    /// Inserts or replaces a note in the active catalog.
    ///
    /// # Contract
    /// - Clears `deleted_at`.
    /// - Removes any same-id entry from recently-deleted.
    /// - Unknown ids are inserted.
    pub fn upsert(&mut self, mut note: Note) {
        note.deleted_at = None;
        let id = note.id;
        replace_or_append(&mut self.notes, note);
        sort_active(&mut self.notes);
        self.recently_deleted.retain(|entry| entry.id != id);
        debug!("event=note_upsert module=store status=ok note_id={id}");
        self.persist();
        self.emit(StoreEvent::Upserted(id));
    }

    /// Moves an active note to recently-deleted, stamping `deleted_at`.
    ///
    /// Returns `false` (and does nothing) when `id` is not active.
    pub fn delete(&mut self, id: NoteId) -> bool {
        let Some(position) = self.notes.iter().position(|note| note.id == id) else {
            debug!("event=note_delete module=store status=skip note_id={id} reason=not_active");
            return false;
        };

        let mut note = self.notes.remove(position);
        note.deleted_at = Some(self.clock.now());
        self.recently_deleted.retain(|entry| entry.id != id);
        self.recently_deleted.push(note);
        sort_deleted(&mut self.recently_deleted);
        debug!("event=note_delete module=store status=ok note_id={id}");
        self.persist();
        self.emit(StoreEvent::Deleted(id));
        true
    }

    /// Moves a recently-deleted note back to active, clearing `deleted_at`.
    ///
    /// Returns `false` (and does nothing) when `id` is not recently deleted.
    pub fn restore(&mut self, id: NoteId) -> bool {
        let Some(position) = self.recently_deleted.iter().position(|note| note.id == id) else {
            debug!("event=note_restore module=store status=skip note_id={id} reason=not_deleted");
            return false;
        };

        let mut note = self.recently_deleted.remove(position);
        note.deleted_at = None;
        replace_or_append(&mut self.notes, note);
        sort_active(&mut self.notes);
        debug!("event=note_restore module=store status=ok note_id={id}");
        self.persist();
        self.emit(StoreEvent::Restored(id));
        true
    }

    /// Removes a note from recently-deleted for good.
    ///
    /// Active notes are never touched; returns `false` when `id` is absent.
    pub fn permanently_delete(&mut self, id: NoteId) -> bool {
        let before = self.recently_deleted.len();
        self.recently_deleted.retain(|note| note.id != id);
        if self.recently_deleted.len() == before {
            debug!(
                "event=note_purge module=store status=skip note_id={id} reason=not_deleted"
            );
            return false;
        }

        debug!("event=note_purge module=store status=ok note_id={id}");
        self.persist();
        self.emit(StoreEvent::PermanentlyDeleted(id));
        true
    }

    /// Permanently removes notes deleted longer than `retention` ago.
    ///
    /// Returns the number of removed notes.
    pub fn purge_expired(&mut self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let Some(cutoff) = self.clock.now().checked_sub_signed(retention) else {
            return 0;
        };

        let before = self.recently_deleted.len();
        self.recently_deleted
            .retain(|note| note.deleted_at.map_or(true, |deleted_at| deleted_at >= cutoff));
        let removed = before - self.recently_deleted.len();
        if removed == 0 {
            return 0;
        }

        info!("event=deleted_expire module=store status=ok removed={removed}");
        self.persist();
        self.emit(StoreEvent::Purged { count: removed });
        removed
    }

    /// Permanently removes every recently-deleted note.
    pub fn empty_recently_deleted(&mut self) -> usize {
        let removed = self.recently_deleted.len();
        if removed == 0 {
            return 0;
        }

        self.recently_deleted.clear();
        info!("event=deleted_empty module=store status=ok removed={removed}");
        self.persist();
        self.emit(StoreEvent::Purged { count: removed });
        removed
    }

    /// Registers a callback invoked after every effective mutation.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&StoreEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    /// Removes a subscription. Returns `false` for unknown ids.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    fn emit(&mut self, event: StoreEvent) {
        for subscriber in self.subscribers.values_mut() {
            subscriber(&event);
        }
    }

    fn persist(&mut self) {
        let started_at = Instant::now();
        let result = encode_document(&self.notes, &self.recently_deleted).and_then(|bytes| {
            self.storage.write_document(&bytes)?;
            Ok(bytes.len())
        });

        match result {
            Ok(bytes) => {
                self.last_persist_error = None;
                info!(
                    "event=store_persist module=store status=ok mode={} notes={} deleted={} bytes={} duration_ms={}",
                    self.storage.mode(),
                    self.notes.len(),
                    self.recently_deleted.len(),
                    bytes,
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => {
                error!(
                    "event=store_persist module=store status=error mode={} duration_ms={} error_code=persist_failed error={}",
                    self.storage.mode(),
                    started_at.elapsed().as_millis(),
                    err
                );
                self.last_persist_error = Some(err.to_string());
            }
        }
    }
}

/// Formats `now` in local time as a human-readable note title.
pub fn format_default_title(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local)
        .format(DEFAULT_TITLE_FORMAT)
        .to_string()
}

fn load_document<S: NoteStorage>(storage: &S) -> (StoreDocument, Option<DocumentShape>) {
    let bytes = match storage.read_document() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return (StoreDocument::default(), None),
        Err(err) => {
            warn!(
                "event=store_load module=store status=error mode={} error_code=read_failed error={}",
                storage.mode(),
                err
            );
            return (StoreDocument::default(), None);
        }
    };

    match decode_document(&bytes) {
        Ok(decoded) => (decoded.document, Some(decoded.shape)),
        Err(err) => {
            warn!(
                "event=store_load module=store status=error mode={} error_code=decode_failed bytes={} error={}",
                storage.mode(),
                bytes.len(),
                err
            );
            (StoreDocument::default(), None)
        }
    }
}

/// Restores catalog invariants on freshly loaded data.
///
/// - Duplicate ids inside a catalog keep the most recent entry.
/// - An id present in both catalogs stays active only.
/// - Stray `deleted_at` on active notes is cleared; deleted notes missing it
///   are stamped with their `updated_at`.
fn normalize_catalogs(document: StoreDocument) -> (Vec<Note>, Vec<Note>) {
    let mut notes = document.notes;
    for note in &mut notes {
        note.deleted_at = None;
    }
    sort_active(&mut notes);
    dedupe_keep_first(&mut notes);

    let active_ids = notes.iter().map(|note| note.id).collect::<HashSet<_>>();
    let mut recently_deleted = document.recently_deleted;
    recently_deleted.retain(|note| !active_ids.contains(&note.id));
    for note in &mut recently_deleted {
        if note.deleted_at.is_none() {
            note.deleted_at = Some(note.updated_at);
        }
    }
    sort_deleted(&mut recently_deleted);
    dedupe_keep_first(&mut recently_deleted);

    (notes, recently_deleted)
}

fn dedupe_keep_first(notes: &mut Vec<Note>) {
    let mut seen = HashSet::new();
    notes.retain(|note| seen.insert(note.id));
}

fn replace_or_append(notes: &mut Vec<Note>, note: Note) {
    match notes.iter_mut().find(|entry| entry.id == note.id) {
        Some(existing) => *existing = note,
        None => notes.push(note),
    }
}

fn sort_active(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn sort_deleted(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::{normalize_catalogs, sort_active};
    use crate::model::note::Note;
    use crate::storage::document::StoreDocument;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn sort_active_breaks_ties_by_id() {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 2, 2, 2).unwrap();
        let low = Note::with_id(Uuid::from_u128(1), at);
        let high = Note::with_id(Uuid::from_u128(2), at);
        let mut notes = vec![high.clone(), low.clone()];
        sort_active(&mut notes);
        assert_eq!(notes, vec![low, high]);
    }

    #[test]
    fn normalize_prefers_active_copy_of_duplicated_note() {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 2, 2, 2).unwrap();
        let mut active = Note::with_id(Uuid::from_u128(7), at);
        active.title = "active".to_string();
        let mut deleted = active.clone();
        deleted.title = "deleted".to_string();
        deleted.deleted_at = Some(at + Duration::hours(1));

        let (notes, recently_deleted) = normalize_catalogs(StoreDocument {
            notes: vec![active.clone()],
            recently_deleted: vec![deleted],
        });
        assert_eq!(notes, vec![active]);
        assert!(recently_deleted.is_empty());
    }

    #[test]
    fn normalize_repairs_deleted_at_markers() {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 2, 2, 2).unwrap();
        let mut stray = Note::with_id(Uuid::from_u128(1), at);
        stray.deleted_at = Some(at);
        let unstamped = Note::with_id(Uuid::from_u128(2), at);

        let (notes, recently_deleted) = normalize_catalogs(StoreDocument {
            notes: vec![stray],
            recently_deleted: vec![unstamped],
        });
        assert_eq!(notes[0].deleted_at, None);
        assert_eq!(recently_deleted[0].deleted_at, Some(at));
    }

    #[test]
    fn normalize_keeps_newest_duplicate_within_catalog() {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 2, 2, 2).unwrap();
        let older = Note::with_id(Uuid::from_u128(3), at);
        let mut newer = older.clone();
        newer.updated_at = at + Duration::minutes(5);
        newer.title = "newer".to_string();

        let (notes, _) = normalize_catalogs(StoreDocument {
            notes: vec![older, newer.clone()],
            recently_deleted: Vec::new(),
        });
        assert_eq!(notes, vec![newer]);
    }
}
