pub mod autosave;
pub mod cache;
pub mod config;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;

pub use autosave::AutoSaveStatus;
pub use cache::{NoteCache, ViewKind};
pub use config::{AutoSaveConfig, ConfigLoader, ConfigPaths, DeleteBehavior, SyncConfig};
pub use model::{NoteDto, NoteRecord};
pub use remote::{RemoteStore, StoreError, StoreResult};
pub use service::{NoteService, PendingFlush};
