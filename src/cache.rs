use indexmap::IndexMap;

use crate::model::NoteRecord;

/// Which backend listing the visible collection currently mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Live,
    Trash,
}

/// In-memory mirror of the visible note collection plus the cursor and UI
/// flags that must stay consistent with it.
///
/// All note mutation funnels through this type, one call at a time; every
/// method is synchronous and returns with the invariants intact: one record
/// per id, insertion order is display order, and a non-empty selection
/// always points at a present record.
#[derive(Debug)]
pub struct NoteCache {
    notes: IndexMap<String, NoteRecord>,
    selected: Option<String>,
    focus_title: bool,
    loading: bool,
    last_error: Option<String>,
    view: ViewKind,
}

impl Default for NoteCache {
    fn default() -> Self {
        Self {
            notes: IndexMap::new(),
            selected: None,
            focus_title: false,
            loading: false,
            last_error: None,
            view: ViewKind::Live,
        }
    }
}

impl NoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Records in display order.
    pub fn notes(&self) -> impl Iterator<Item = &NoteRecord> {
        self.notes.values()
    }

    pub fn get(&self, id: &str) -> Option<&NoteRecord> {
        self.notes.get(id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The record under the cursor, recomputed on demand.
    pub fn active_note(&self) -> Option<&NoteRecord> {
        self.selected.as_deref().and_then(|id| self.notes.get(id))
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn should_focus_title(&self) -> bool {
        self.focus_title
    }

    /// Atomically swaps the visible collection. The cursor survives only if
    /// its id is present in the new listing.
    pub fn replace_all(&mut self, records: Vec<NoteRecord>, view: ViewKind) {
        self.notes = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        self.view = view;
        if let Some(id) = self.selected.clone() {
            if !self.notes.contains_key(id.as_str()) {
                self.clear_selection();
            }
        }
    }

    /// Inserts a record at display position 0.
    pub fn prepend(&mut self, record: NoteRecord) {
        self.notes.shift_insert(0, record.id.clone(), record);
    }

    /// Applies a mutation to the record with this id, if present. The sole
    /// path by which title/body/dirty fields change.
    pub fn update_local<F>(&mut self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut NoteRecord),
    {
        match self.notes.get_mut(id) {
            Some(record) => {
                mutate(record);
                true
            }
            None => false,
        }
    }

    /// Drops the record. When it was selected, the cursor falls to the
    /// record now occupying the removed slot, else the new tail, else
    /// nothing.
    pub fn remove(&mut self, id: &str) -> Option<NoteRecord> {
        let (index, _, record) = self.notes.shift_remove_full(id)?;
        if self.selected.as_deref() == Some(id) {
            self.selected = self
                .notes
                .get_index(index)
                .or_else(|| self.notes.last())
                .map(|(next_id, _)| next_id.clone());
            self.focus_title = false;
        }
        Some(record)
    }

    /// Moves the cursor; ignored when the id is not in the visible
    /// collection. Selecting always drops a pending title-focus request.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.notes.contains_key(id) {
            return false;
        }
        self.selected = Some(id.to_string());
        self.focus_title = false;
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.focus_title = false;
    }

    pub fn request_title_focus(&mut self) {
        self.focus_title = true;
    }

    pub fn clear_title_focus(&mut self) {
        self.focus_title = false;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn record(id: &str, title: &str) -> NoteRecord {
        let ts = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        NoteRecord {
            id: id.to_string(),
            title: title.to_string(),
            body: String::new(),
            created_at: ts,
            updated_at: ts,
            file_path: None,
            is_dirty: false,
            is_deleted: false,
        }
    }

    fn cache_with(ids: &[&str]) -> NoteCache {
        let mut cache = NoteCache::new();
        let records = ids.iter().map(|id| record(id, id)).collect();
        cache.replace_all(records, ViewKind::Live);
        cache
    }

    #[test]
    fn remove_selected_advances_to_the_next_record() {
        let mut cache = cache_with(&["a", "b", "c"]);
        assert!(cache.select("a"));
        cache.remove("a");
        assert_eq!(cache.selected_id(), Some("b"));
    }

    #[test]
    fn remove_selected_tail_falls_back_to_new_tail() {
        let mut cache = cache_with(&["a", "b", "c"]);
        assert!(cache.select("c"));
        cache.remove("c");
        assert_eq!(cache.selected_id(), Some("b"));
    }

    #[test]
    fn remove_last_remaining_record_clears_selection() {
        let mut cache = cache_with(&["a"]);
        assert!(cache.select("a"));
        cache.remove("a");
        assert_eq!(cache.selected_id(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_unselected_record_keeps_cursor() {
        let mut cache = cache_with(&["a", "b"]);
        assert!(cache.select("b"));
        cache.remove("a");
        assert_eq!(cache.selected_id(), Some("b"));
    }

    #[test]
    fn replace_all_preserves_selection_only_when_still_present() {
        let mut cache = cache_with(&["a", "b"]);
        assert!(cache.select("b"));
        cache.replace_all(vec![record("b", "b"), record("c", "c")], ViewKind::Live);
        assert_eq!(cache.selected_id(), Some("b"));

        cache.replace_all(vec![record("d", "d")], ViewKind::Trash);
        assert_eq!(cache.selected_id(), None);
        assert_eq!(cache.view(), ViewKind::Trash);
    }

    #[test]
    fn select_rejects_unknown_ids() {
        let mut cache = cache_with(&["a"]);
        assert!(!cache.select("ghost"));
        assert_eq!(cache.selected_id(), None);
    }

    #[test]
    fn select_drops_a_pending_title_focus_request() {
        let mut cache = cache_with(&["a"]);
        cache.request_title_focus();
        assert!(cache.should_focus_title());
        assert!(cache.select("a"));
        assert!(!cache.should_focus_title());
    }

    #[test]
    fn prepend_puts_the_record_first() {
        let mut cache = cache_with(&["a", "b"]);
        cache.prepend(record("new", "new"));
        let order: Vec<&str> = cache.notes().map(|note| note.id.as_str()).collect();
        assert_eq!(order, vec!["new", "a", "b"]);
    }

    #[test]
    fn update_local_is_a_noop_for_missing_ids() {
        let mut cache = cache_with(&["a"]);
        assert!(!cache.update_local("ghost", |note| note.is_dirty = true));
        assert!(cache.update_local("a", |note| note.is_dirty = true));
        assert!(cache.get("a").unwrap().is_dirty);
    }
}
