use std::time::{Duration, Instant};

use crate::config::AutoSaveConfig;

/// Decides when a dirty note's content is sent to the remote store.
///
/// One logical timer for the active editing session: every edit restarts the
/// quiet period, a due deadline or an explicit save issues a flush, and at
/// most one flush is in flight at a time. The timer is a deadline compared
/// against caller-supplied instants; nothing here spawns threads or sleeps.
#[derive(Debug)]
pub struct AutoSaveScheduler {
    enabled: bool,
    delay: Duration,
    state: FlushState,
    /// Monotonic counter, bumped on every recorded edit. A flush captures it
    /// at issue time so the completion can tell whether newer edits arrived
    /// while the write was in flight.
    edit_seq: u64,
    save_queued: bool,
    last_edit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FlushState {
    Idle,
    Armed { note_id: String, deadline: Instant },
    Flushing { note_id: String, issued_seq: u64 },
}

/// A write the scheduler has committed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushJob {
    note_id: String,
    seq: u64,
}

impl FlushJob {
    pub fn note_id(&self) -> &str {
        &self.note_id
    }
}

/// Outcome of asking for an explicit save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveDisposition {
    /// Issue this write now; any armed debounce has been cancelled.
    Write(FlushJob),
    /// A write is already in flight. The save waits for its outcome instead
    /// of issuing a second concurrent write for the same record.
    Deferred,
}

/// What a resolved flush means for the record's dirty flag.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushResolution {
    /// Confirmed and not superseded: the dirty flag may be cleared.
    Clean,
    /// Newer edits arrived mid-flight. The record stays dirty and the
    /// debounce has been re-armed with a full quiet period.
    StillDirty,
    /// Newer edits plus a queued explicit save: issue this follow-up write
    /// immediately.
    Followup(FlushJob),
    /// The write failed. The record stays dirty; nothing is rescheduled —
    /// the next edit or explicit save re-triggers naturally.
    Failed,
    /// Completion of a superseded or cancelled job; ignored.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveStatus {
    Disabled,
    Idle,
    Pending { note_id: String },
    Saving { note_id: String },
}

impl AutoSaveScheduler {
    pub fn new(config: &AutoSaveConfig) -> Self {
        Self {
            enabled: config.enabled,
            delay: config.delay(),
            state: FlushState::Idle,
            edit_seq: 0,
            save_queued: false,
            last_edit: None,
        }
    }

    /// Registers a local edit, restarting the quiet period. Edits retarget
    /// the timer to the most recently edited note.
    pub fn record_edit(&mut self, note_id: &str, now: Instant) {
        self.edit_seq += 1;
        self.last_edit = Some(note_id.to_string());
        match self.state {
            // the completion handler re-arms once the in-flight write lands
            FlushState::Flushing { .. } => {}
            _ => {
                self.state = FlushState::Armed {
                    note_id: note_id.to_string(),
                    deadline: now + self.delay,
                };
            }
        }
    }

    /// Issues the debounced write once the quiet period has elapsed. Never
    /// yields while another flush is in flight, and never when autosave is
    /// disabled (explicit saves still work).
    pub fn poll(&mut self, now: Instant) -> Option<FlushJob> {
        if !self.enabled {
            return None;
        }
        match &self.state {
            FlushState::Armed { note_id, deadline } if now >= *deadline => {
                let job = FlushJob {
                    note_id: note_id.clone(),
                    seq: self.edit_seq,
                };
                self.state = FlushState::Flushing {
                    note_id: job.note_id.clone(),
                    issued_seq: job.seq,
                };
                Some(job)
            }
            _ => None,
        }
    }

    /// Explicit save: pre-empts and subsumes the debounce.
    pub fn request_save(&mut self, note_id: &str) -> SaveDisposition {
        match self.state {
            FlushState::Flushing { .. } => {
                self.save_queued = true;
                SaveDisposition::Deferred
            }
            // replacing the state drops any armed deadline before the write
            // goes out, so the cancelled timer can never fire a duplicate
            _ => {
                let job = FlushJob {
                    note_id: note_id.to_string(),
                    seq: self.edit_seq,
                };
                self.state = FlushState::Flushing {
                    note_id: job.note_id.clone(),
                    issued_seq: job.seq,
                };
                SaveDisposition::Write(job)
            }
        }
    }

    /// Resolves an issued flush with the store's outcome. A queued explicit
    /// save adopts this outcome: satisfied when the write carried the newest
    /// content, converted into an immediate follow-up write otherwise.
    pub fn complete(&mut self, job: &FlushJob, succeeded: bool, now: Instant) -> FlushResolution {
        let in_flight = matches!(
            &self.state,
            FlushState::Flushing { note_id, issued_seq }
                if *issued_seq == job.seq && *note_id == job.note_id
        );
        if !in_flight {
            return FlushResolution::Stale;
        }
        let queued = std::mem::take(&mut self.save_queued);
        if !succeeded {
            self.state = FlushState::Idle;
            return FlushResolution::Failed;
        }
        if job.seq == self.edit_seq {
            self.state = FlushState::Idle;
            return FlushResolution::Clean;
        }
        let target = self
            .last_edit
            .clone()
            .unwrap_or_else(|| job.note_id.clone());
        if queued {
            let next = FlushJob {
                note_id: target.clone(),
                seq: self.edit_seq,
            };
            self.state = FlushState::Flushing {
                note_id: target,
                issued_seq: next.seq,
            };
            FlushResolution::Followup(next)
        } else {
            self.state = FlushState::Armed {
                note_id: target,
                deadline: now + self.delay,
            };
            FlushResolution::StillDirty
        }
    }

    /// Cancels an armed timer targeting this note (removal path). An
    /// in-flight write for it is left to resolve on its own.
    pub fn forget(&mut self, note_id: &str) {
        if let FlushState::Armed { note_id: armed, .. } = &self.state {
            if armed == note_id {
                self.state = FlushState::Idle;
            }
        }
    }

    /// Dispose path: drops any armed timer and queued save. Completions of
    /// writes already in flight become stale.
    pub fn cancel(&mut self) {
        self.state = FlushState::Idle;
        self.save_queued = false;
    }

    pub fn has_pending_save(&self) -> bool {
        matches!(self.state, FlushState::Armed { .. })
    }

    pub fn is_flushing(&self) -> bool {
        matches!(self.state, FlushState::Flushing { .. })
    }

    pub fn status(&self) -> AutoSaveStatus {
        match &self.state {
            FlushState::Flushing { note_id, .. } => AutoSaveStatus::Saving {
                note_id: note_id.clone(),
            },
            _ if !self.enabled => AutoSaveStatus::Disabled,
            FlushState::Armed { note_id, .. } => AutoSaveStatus::Pending {
                note_id: note_id.clone(),
            },
            FlushState::Idle => AutoSaveStatus::Idle,
        }
    }
}
