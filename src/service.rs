use std::time::Instant;

use time::OffsetDateTime;

use crate::autosave::{AutoSaveScheduler, AutoSaveStatus, FlushJob, FlushResolution, SaveDisposition};
use crate::cache::{NoteCache, ViewKind};
use crate::config::AutoSaveConfig;
use crate::model::NoteRecord;
use crate::remote::{RemoteStore, StoreError, StoreResult};

/// Coordinates the cache, the write-back scheduler, and the remote store.
///
/// Construct one per session with the store injected; presentation code
/// holds it by reference and drives it through these methods. Passive
/// operations swallow store failures into the error slot after logging them;
/// [`update`](Self::update) and [`save_active`](Self::save_active) re-raise
/// so an explicit Save control can react. No failure path ever reverts local
/// edits — the dirty flag is the single source of truth for "needs another
/// attempt".
pub struct NoteService<S: RemoteStore> {
    store: S,
    cache: NoteCache,
    scheduler: AutoSaveScheduler,
}

/// A write the host must carry to the store: the target note plus its
/// content as snapshotted when the flush was issued.
#[derive(Debug, Clone)]
pub struct PendingFlush {
    job: FlushJob,
    pub title: String,
    pub body: String,
}

impl PendingFlush {
    pub fn note_id(&self) -> &str {
        self.job.note_id()
    }
}

impl<S: RemoteStore> NoteService<S> {
    pub fn new(store: S, auto_save: &AutoSaveConfig) -> Self {
        Self {
            store,
            cache: NoteCache::new(),
            scheduler: AutoSaveScheduler::new(auto_save),
        }
    }

    // ------------------------------------------------------------------
    // read accessors
    // ------------------------------------------------------------------

    /// Records of the current view, in display order.
    pub fn notes(&self) -> impl Iterator<Item = &NoteRecord> {
        self.cache.notes()
    }

    pub fn active_note(&self) -> Option<&NoteRecord> {
        self.cache.active_note()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.cache.selected_id()
    }

    pub fn view(&self) -> ViewKind {
        self.cache.view()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.cache.last_error()
    }

    pub fn should_focus_title(&self) -> bool {
        self.cache.should_focus_title()
    }

    pub fn autosave_status(&self) -> AutoSaveStatus {
        self.scheduler.status()
    }

    /// The injected store, e.g. for host-side reconfiguration.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ------------------------------------------------------------------
    // selection and flags
    // ------------------------------------------------------------------

    pub fn select(&mut self, id: &str) -> bool {
        self.cache.select(id)
    }

    pub fn request_title_focus(&mut self) {
        self.cache.request_title_focus();
    }

    pub fn clear_title_focus(&mut self) {
        self.cache.clear_title_focus();
    }

    pub fn clear_error(&mut self) {
        self.cache.clear_error();
    }

    // ------------------------------------------------------------------
    // listings
    // ------------------------------------------------------------------

    /// Fetches the live listing. Selection survives when its id is still
    /// present; a failed fetch leaves the previous collection untouched.
    pub fn load(&mut self) {
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.list() {
            Ok(records) => self.cache.replace_all(records, ViewKind::Live),
            Err(err) => self.record_failure("Failed to load notes", &err),
        }
        self.cache.set_loading(false);
    }

    /// Fetches the trash listing.
    pub fn load_deleted(&mut self) {
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.list_deleted() {
            Ok(records) => self.cache.replace_all(records, ViewKind::Trash),
            Err(err) => self.record_failure("Failed to load deleted notes", &err),
        }
        self.cache.set_loading(false);
    }

    /// Asks the backend for a fresh empty record, shows it first in the
    /// list, selects it, and requests focus on its title field.
    pub fn create(&mut self) {
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.create("", "") {
            Ok(record) => {
                let id = record.id.clone();
                self.cache.prepend(record);
                self.cache.select(&id);
                self.cache.request_title_focus();
            }
            Err(err) => self.record_failure("Failed to create note", &err),
        }
        self.cache.set_loading(false);
    }

    /// Blank or whitespace queries are the unfiltered listing; anything else
    /// replaces the collection with results and drops the selection.
    pub fn search(&mut self, query: &str) {
        if query.trim().is_empty() {
            self.load();
            return;
        }
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.search(query) {
            Ok(records) => {
                self.cache.replace_all(records, ViewKind::Live);
                self.cache.clear_selection();
            }
            Err(err) => self.record_failure("Failed to search notes", &err),
        }
        self.cache.set_loading(false);
    }

    /// Re-hydrates one record from the store. Skipped when the local copy
    /// has unsaved edits, which are never clobbered by stale remote state.
    pub fn refresh_note(&mut self, id: &str) {
        if self.cache.get(id).map(|note| note.is_dirty).unwrap_or(false) {
            tracing::debug!(note = id, "skipping refresh of a note with unsaved edits");
            return;
        }
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.get(id) {
            Ok(Some(record)) => {
                let _ = self.cache.update_local(id, move |note| *note = record);
            }
            Ok(None) => {
                tracing::warn!(note = id, "note vanished from the store");
                self.cache
                    .set_error(Some(format!("Note {id} is no longer available")));
            }
            Err(err) => self.record_failure("Failed to refresh note", &err),
        }
        self.cache.set_loading(false);
    }

    // ------------------------------------------------------------------
    // local edits
    // ------------------------------------------------------------------

    /// Retitles the active note locally, marking it dirty and restarting the
    /// autosave debounce.
    pub fn update_title(&mut self, text: &str) {
        self.edit_active(|note| note.title = text.to_string());
    }

    /// Rewrites the active note's body locally, marking it dirty and
    /// restarting the autosave debounce.
    pub fn update_body(&mut self, text: &str) {
        self.edit_active(|note| note.body = text.to_string());
    }

    fn edit_active(&mut self, apply: impl FnOnce(&mut NoteRecord)) {
        let Some(id) = self.cache.selected_id().map(str::to_string) else {
            return;
        };
        let edited_at = OffsetDateTime::now_utc();
        self.cache.update_local(&id, |note| {
            apply(note);
            note.is_dirty = true;
            note.updated_at = edited_at;
        });
        self.scheduler.record_edit(&id, Instant::now());
    }

    // ------------------------------------------------------------------
    // explicit save
    // ------------------------------------------------------------------

    /// Write-through save: applies the content locally first (never rolled
    /// back), then persists through the scheduler so an armed debounce is
    /// subsumed rather than left to fire a duplicate. Re-raises on failure;
    /// the record stays dirty and visibly edited either way.
    ///
    /// When a split-phase write is already in flight the save is queued
    /// behind it and `Ok(())` is returned; the queued write surfaces as a
    /// follow-up from [`complete_flush`](Self::complete_flush).
    pub fn update(&mut self, id: &str, title: &str, body: &str) -> StoreResult<()> {
        let edited_at = OffsetDateTime::now_utc();
        let known = self.cache.update_local(id, |note| {
            note.title = title.to_string();
            note.body = body.to_string();
            note.is_dirty = true;
            note.updated_at = edited_at;
        });
        if !known {
            let err = StoreError::NotFound(id.to_string());
            self.record_failure("Failed to save note", &err);
            return Err(err);
        }
        let now = Instant::now();
        self.scheduler.record_edit(id, now);
        match self.scheduler.request_save(id) {
            SaveDisposition::Write(job) => self.drive_flush(job, now, true),
            SaveDisposition::Deferred => {
                tracing::debug!(note = id, "save queued behind an in-flight write-back");
                Ok(())
            }
        }
    }

    /// [`update`](Self::update) applied to the active note; a no-op when
    /// nothing is selected.
    pub fn save_active(&mut self) -> StoreResult<()> {
        let Some(note) = self.cache.active_note() else {
            return Ok(());
        };
        let (id, title, body) = (note.id.clone(), note.title.clone(), note.body.clone());
        self.update(&id, &title, &body)
    }

    // ------------------------------------------------------------------
    // deletion workflows
    // ------------------------------------------------------------------

    /// Backend-routed delete. The record leaves the visible list whether the
    /// backend trashed or purged it; the trash view refreshes independently
    /// when the user navigates there.
    pub fn delete(&mut self, id: &str) {
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.delete(id) {
            Ok(()) => {
                self.scheduler.forget(id);
                self.cache.remove(id);
            }
            Err(err) => self.record_failure("Failed to delete note", &err),
        }
        self.cache.set_loading(false);
    }

    /// Explicit move-to-trash, regardless of the backend's default policy.
    pub fn soft_delete(&mut self, id: &str) {
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.soft_delete(id) {
            Ok(()) => {
                self.scheduler.forget(id);
                self.cache.remove(id);
            }
            Err(err) => self.record_failure("Failed to move note to trash", &err),
        }
        self.cache.set_loading(false);
    }

    /// Brings a trashed note back, then reloads the live view — the
    /// restored record's position in the ordering is the backend's call.
    pub fn restore(&mut self, id: &str) {
        self.cache.set_loading(true);
        self.cache.set_error(None);
        match self.store.restore(id) {
            Ok(()) => self.load(),
            Err(err) => self.record_failure("Failed to restore note", &err),
        }
        self.cache.set_loading(false);
    }

    // ------------------------------------------------------------------
    // write-back driving
    // ------------------------------------------------------------------

    /// Blocking convenience for poll-loop hosts: runs a due debounce flush
    /// inline. Failures land in the error slot and the record stays dirty.
    pub fn tick(&mut self, now: Instant) {
        if let Some(job) = self.scheduler.poll(now) {
            let _ = self.drive_flush(job, now, false);
        }
    }

    /// Split-phase driving for hosts that own an async boundary: take the
    /// due write, perform the remote call yourself, then hand the outcome to
    /// [`complete_flush`](Self::complete_flush).
    pub fn begin_flush(&mut self, now: Instant) -> Option<PendingFlush> {
        let job = self.scheduler.poll(now)?;
        self.snapshot(job, now)
    }

    /// Split-phase explicit save of the active note. `None` when nothing is
    /// selected or when a write is already in flight — in the latter case
    /// the save is queued and surfaces as a follow-up from
    /// [`complete_flush`](Self::complete_flush).
    pub fn begin_manual_flush(&mut self, now: Instant) -> Option<PendingFlush> {
        let note = self.cache.active_note()?;
        let id = note.id.clone();
        match self.scheduler.request_save(&id) {
            SaveDisposition::Write(job) => self.snapshot(job, now),
            SaveDisposition::Deferred => None,
        }
    }

    /// Resolves a split-phase write. Clears the dirty flag only when no
    /// newer edit arrived while the write was in flight. A returned job is a
    /// queued explicit save that must be issued next.
    pub fn complete_flush(
        &mut self,
        pending: &PendingFlush,
        result: StoreResult<()>,
        now: Instant,
    ) -> Option<PendingFlush> {
        match result {
            Ok(()) => match self.scheduler.complete(&pending.job, true, now) {
                FlushResolution::Clean => {
                    let saved_at = OffsetDateTime::now_utc();
                    self.cache.update_local(pending.note_id(), |note| {
                        note.is_dirty = false;
                        note.updated_at = saved_at;
                    });
                    None
                }
                FlushResolution::Followup(job) => self.snapshot(job, now),
                FlushResolution::StillDirty | FlushResolution::Failed => None,
                FlushResolution::Stale => {
                    tracing::debug!(
                        note = pending.note_id(),
                        "discarding outcome of a superseded write"
                    );
                    None
                }
            },
            Err(err) => {
                match self.scheduler.complete(&pending.job, false, now) {
                    FlushResolution::Stale => {
                        tracing::debug!(
                            note = pending.note_id(),
                            "discarding failure of a superseded write"
                        );
                    }
                    _ => self.record_failure("Failed to save note", &err),
                }
                None
            }
        }
    }

    /// Releases the session: cancels any armed debounce and queued save.
    /// Writes already in flight are not cancelled; their completions are
    /// discarded as stale.
    pub fn dispose(&mut self) {
        self.scheduler.cancel();
    }

    fn snapshot(&mut self, job: FlushJob, now: Instant) -> Option<PendingFlush> {
        match self.cache.get(job.note_id()) {
            Some(note) => Some(PendingFlush {
                title: note.title.clone(),
                body: note.body.clone(),
                job,
            }),
            None => {
                // target vanished between arming and firing; drop the write
                tracing::debug!(
                    note = job.note_id(),
                    "skipping write-back for a note no longer in the cache"
                );
                let _ = self.scheduler.complete(&job, false, now);
                None
            }
        }
    }

    fn drive_flush(&mut self, first: FlushJob, now: Instant, reraise: bool) -> StoreResult<()> {
        let mut pending = match self.snapshot(first, now) {
            Some(pending) => pending,
            None => return Ok(()),
        };
        loop {
            match self
                .store
                .update(pending.note_id(), &pending.title, &pending.body)
            {
                Ok(()) => match self.complete_flush(&pending, Ok(()), now) {
                    Some(next) => pending = next,
                    None => return Ok(()),
                },
                Err(err) => {
                    let _ = self.complete_flush(&pending, Err(err.clone()), now);
                    return if reraise { Err(err) } else { Ok(()) };
                }
            }
        }
    }

    fn record_failure(&mut self, what: &str, err: &StoreError) {
        tracing::error!(error = %err, "{}", what);
        self.cache.set_error(Some(format!("{what}: {err}")));
    }
}
