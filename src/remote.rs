use thiserror::Error;

use crate::model::NoteRecord;

/// Failures crossing the remote-store boundary.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the call at the
    /// transport layer.
    #[error("note store unreachable: {0}")]
    Transport(String),
    #[error("note {0} no longer exists in the store")]
    NotFound(String),
    /// The backend accepted the call but refused the operation.
    #[error("note store rejected the request: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Request/response port to the external note-persistence backend.
///
/// The backend owns delete policy, trash retention, and file layout; this
/// side only chooses which operation to invoke. `delete` in particular is
/// routed by the backend to either a soft or a permanent delete according to
/// its configured behavior, so callers must not assume which one happened.
/// Calls are never cancelled once issued; whoever drives them adopts the
/// outcome whenever it returns.
pub trait RemoteStore {
    /// Live notes in the backend's display order.
    fn list(&mut self) -> StoreResult<Vec<NoteRecord>>;
    /// Soft-deleted notes for the trash view.
    fn list_deleted(&mut self) -> StoreResult<Vec<NoteRecord>>;
    fn get(&mut self, id: &str) -> StoreResult<Option<NoteRecord>>;
    /// Creates a record; the backend assigns the id and both timestamps.
    fn create(&mut self, title: &str, body: &str) -> StoreResult<NoteRecord>;
    fn update(&mut self, id: &str, title: &str, body: &str) -> StoreResult<()>;
    fn soft_delete(&mut self, id: &str) -> StoreResult<()>;
    /// Policy-routed delete: trash or permanent, per backend settings.
    fn delete(&mut self, id: &str) -> StoreResult<()>;
    fn restore(&mut self, id: &str) -> StoreResult<()>;
    fn search(&mut self, query: &str) -> StoreResult<Vec<NoteRecord>>;
}
