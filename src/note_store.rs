//! The note store: the authoritative list of notes and its persisted mirror.
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    Feedback, KeyValueStore, Note, NoteQuery, NoteUpdate, NotesError, PersistQueueStats,
    PersistedList, Record, Result, TagFilter,
};

impl Record for Note {
    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Keeps the newest note first. The sort is stable, so equal timestamps keep
/// their insertion order.
fn sort_newest_first(notes: &mut Vec<Note>) {
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Manages the list of notes.
///
/// Mutations apply to memory immediately and are persisted in the background;
/// none of them report persistence failures. Lookups that miss are no-ops.
pub struct NoteStore {
    list: PersistedList<Note>,
    feedback: Arc<dyn Feedback>,
}

impl NoteStore {
    /// Opens the store under `key` and starts loading persisted notes.
    ///
    /// Must be called from within a tokio runtime. Until the load completes
    /// the store reads as empty.
    pub fn open(kv: Arc<dyn KeyValueStore>, key: &str, feedback: Arc<dyn Feedback>) -> Result<Self> {
        info!("Opening note store under key '{}'", key);
        let list = PersistedList::open(kv, key, sort_newest_first)?;
        Ok(Self { list, feedback })
    }

    /// Adds a note, keeping the list sorted newest first.
    ///
    /// The note is stored as given; content validation belongs to
    /// [`Note::new`].
    pub fn add(&self, note: Note) {
        info!("Adding note: {}", note.id);
        self.list.insert(note);
        self.feedback.success();
    }

    /// Removes the note with `id`, if present.
    pub fn delete(&self, id: Uuid) -> Option<Note> {
        let removed = self.list.remove(id);
        match &removed {
            Some(_) => info!("Deleted note: {}", id),
            None => debug!("Delete ignored, no note {}", id),
        }
        removed
    }

    /// Removes the notes at the given positions of the current list.
    pub fn delete_at(&self, indices: &[usize]) -> Vec<Note> {
        let removed = self.list.remove_at(indices);
        info!("Deleted {} notes by position", removed.len());
        removed
    }

    /// Replaces the supplied fields of note `id` and re-sorts.
    ///
    /// Returns `false` and changes nothing when no such note exists.
    pub fn update(&self, id: Uuid, update: NoteUpdate) -> bool {
        if update.is_empty() {
            debug!("Empty update for note {}", id);
        }

        let found = self.list.modify(id, |note| update.apply_to(note));
        if found {
            info!("Updated note: {}", id);
            self.feedback.success();
        } else {
            debug!("Update ignored, no note {}", id);
        }
        found
    }

    /// Removes every note.
    pub fn clear(&self) {
        info!("Clearing all notes");
        self.list.clear();
        self.feedback.success();
    }

    /// Notes matching `filter`, in list order.
    pub fn filter(&self, filter: &TagFilter) -> Vec<Note> {
        self.list.with_records(|notes| {
            notes
                .iter()
                .filter(|note| filter.matches(note))
                .cloned()
                .collect()
        })
    }

    /// Tag filter followed by free-text search.
    pub fn search(&self, query: &NoteQuery) -> Vec<Note> {
        self.list.with_records(|notes| query.apply(notes))
    }

    pub fn count(&self, filter: &TagFilter) -> usize {
        self.list
            .with_records(|notes| notes.iter().filter(|note| filter.matches(note)).count())
    }

    pub fn get(&self, id: Uuid) -> Option<Note> {
        self.list.get(id)
    }

    /// Resolves a (possibly shortened) identifier to a single note.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Note> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(NotesError::InvalidInput {
                message: "note id cannot be empty".to_string(),
            });
        }

        let mut matches: Vec<Note> = self.list.with_records(|notes| {
            notes
                .iter()
                .filter(|note| note.id.to_string().starts_with(&prefix))
                .cloned()
                .collect()
        });

        match matches.len() {
            0 => Err(NotesError::NoteNotFound { id: prefix }),
            1 => Ok(matches.remove(0)),
            n => Err(NotesError::AmbiguousId { prefix, matches: n }),
        }
    }

    /// Current notes, newest first.
    pub fn notes(&self) -> Vec<Note> {
        self.list.snapshot()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Receiver notified on every change, including the initial load.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Note>> {
        self.list.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.list.is_loaded()
    }

    pub async fn wait_loaded(&self) {
        self.list.wait_loaded().await;
    }

    /// Waits until every scheduled write has reached storage (or failed).
    pub async fn flush(&self) {
        self.list.flush().await;
    }

    pub async fn shutdown(&self) {
        info!("Shutting down note store");
        self.list.shutdown().await;
    }

    pub fn persist_stats(&self) -> PersistQueueStats {
        self.list.persist_stats()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::{BuiltinTag, CustomTag, MemoryKeyValueStore, NoFeedback};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn note(content: &str, tag: BuiltinTag, secs: i64) -> Note {
        Note::with_timestamp(content, tag, None, ts(secs)).unwrap()
    }

    async fn empty_store() -> NoteStore {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = NoteStore::open(kv, "saved_notes", Arc::new(NoFeedback)).unwrap();
        store.wait_loaded().await;
        store
    }

    fn is_sorted_newest_first(notes: &[Note]) -> bool {
        notes.windows(2).all(|w| w[0].created_at >= w[1].created_at)
    }

    #[tokio::test]
    async fn adds_keep_newest_first_order() {
        let store = empty_store().await;
        for secs in [300, 100, 500, 200, 400, 200] {
            store.add(note(&format!("t{}", secs), BuiltinTag::General, secs));
            assert!(is_sorted_newest_first(&store.notes()));
        }
        assert_eq!(store.len(), 6);
        assert_eq!(store.notes()[0].content, "t500");
    }

    #[tokio::test]
    async fn add_then_delete_restores_previous_set() {
        let store = empty_store().await;
        store.add(note("a", BuiltinTag::Todo, 10));
        store.add(note("b", BuiltinTag::Idea, 20));
        let before = store.notes();

        let extra = note("extra", BuiltinTag::Tools, 15);
        let extra_id = extra.id;
        store.add(extra);
        assert_eq!(store.len(), 3);

        assert_eq!(store.delete(extra_id).map(|n| n.content), Some("extra".to_string()));
        assert_eq!(store.notes(), before);

        assert!(store.delete(Uuid::new_v4()).is_none());
        assert_eq!(store.notes(), before);
    }

    #[tokio::test]
    async fn delete_at_ignores_out_of_range_positions() {
        let store = empty_store().await;
        store.add(note("old", BuiltinTag::Todo, 1));
        store.add(note("mid", BuiltinTag::Todo, 2));
        store.add(note("new", BuiltinTag::Todo, 3));

        let removed = store.delete_at(&[0, 2, 9]);
        let removed: Vec<_> = removed.into_iter().map(|n| n.content).collect();
        assert_eq!(removed, ["new", "old"]);
        assert_eq!(store.notes()[0].content, "mid");
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let store = empty_store().await;
        let work = CustomTag::new("Work", None, None).unwrap();
        let original = Note::with_timestamp("draft", BuiltinTag::Idea, Some(work.clone()), ts(100)).unwrap();
        let id = original.id;
        store.add(original.clone());

        assert!(store.update(id, NoteUpdate::default().content("final")));
        let updated = store.get(id).unwrap();
        assert_eq!(updated.content, "final");
        assert_eq!(updated.tag, BuiltinTag::Idea);
        assert_eq!(updated.custom_tag_id(), Some(work.id));
        assert_eq!(updated.created_at, ts(100));

        assert!(store.update(id, NoteUpdate::default().tag(BuiltinTag::Todo)));
        let updated = store.get(id).unwrap();
        assert_eq!(updated.content, "final");
        assert_eq!(updated.tag, BuiltinTag::Todo);
        assert_eq!(updated.custom_tag_id(), Some(work.id));

        assert!(store.update(id, NoteUpdate::default().custom_tag(None)));
        let updated = store.get(id).unwrap();
        assert!(updated.custom_tag.is_none());
        assert_eq!(updated.tag, BuiltinTag::Todo);
        assert_eq!(updated.created_at, ts(100));

        assert!(store.update(id, NoteUpdate::default().created_at(ts(50))));
        let updated = store.get(id).unwrap();
        assert_eq!(updated.created_at, ts(50));
        assert_eq!(updated.content, "final");
    }

    #[tokio::test]
    async fn update_of_timestamp_resorts() {
        let store = empty_store().await;
        let a = note("a", BuiltinTag::General, 100);
        let a_id = a.id;
        store.add(a);
        store.add(note("b", BuiltinTag::General, 200));
        assert_eq!(store.notes()[0].content, "b");

        store.update(a_id, NoteUpdate::default().created_at(ts(300)));
        assert_eq!(store.notes()[0].content, "a");
        assert!(is_sorted_newest_first(&store.notes()));
    }

    #[tokio::test]
    async fn update_of_missing_note_is_a_noop() {
        let store = empty_store().await;
        store.add(note("a", BuiltinTag::General, 100));
        let before = store.notes();
        let scheduled = store.persist_stats().scheduled;

        assert!(!store.update(Uuid::new_v4(), NoteUpdate::default().content("x")));
        assert_eq!(store.notes(), before);
        assert_eq!(store.persist_stats().scheduled, scheduled);
    }

    #[tokio::test]
    async fn filter_returns_matching_subsequence() {
        let store = empty_store().await;
        let work = CustomTag::new("Work", None, None).unwrap();
        store.add(note("buy milk", BuiltinTag::Todo, 100));
        store.add(note("new idea", BuiltinTag::Idea, 200));
        store.add(Note::with_timestamp("ship it", BuiltinTag::Todo, Some(work.clone()), ts(300)).unwrap());

        let contents = |notes: Vec<Note>| notes.into_iter().map(|n| n.content).collect::<Vec<_>>();
        assert_eq!(
            contents(store.filter(&TagFilter::All)),
            ["ship it", "new idea", "buy milk"]
        );
        assert_eq!(
            contents(store.filter(&TagFilter::Builtin(BuiltinTag::Todo))),
            ["ship it", "buy milk"]
        );
        assert_eq!(contents(store.filter(&TagFilter::Custom(work.id))), ["ship it"]);
        assert!(store.filter(&TagFilter::Builtin(BuiltinTag::Tools)).is_empty());
        assert_eq!(store.count(&TagFilter::Builtin(BuiltinTag::Todo)), 2);
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let store = empty_store().await;
        store.add(note("a", BuiltinTag::General, 1));
        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn resolves_id_prefixes() {
        let store = empty_store().await;
        let a = note("a", BuiltinTag::General, 1);
        let a_id = a.id;
        store.add(a);

        let short = &a_id.to_string()[..8];
        assert_eq!(store.find_by_prefix(short).unwrap().id, a_id);
        assert_eq!(store.find_by_prefix(&short.to_uppercase()).unwrap().id, a_id);
        assert!(matches!(
            store.find_by_prefix("zzzz"),
            Err(NotesError::NoteNotFound { .. })
        ));
        assert!(matches!(
            store.find_by_prefix(""),
            Err(NotesError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn subscribers_see_mutations() {
        let store = empty_store().await;
        let mut rx = store.subscribe();
        store.add(note("a", BuiltinTag::General, 1));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
