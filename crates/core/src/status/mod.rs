//! Job status tracking.

mod memory;
mod sqlite_store;
mod store;
mod types;

pub use memory::MemoryStatusStore;
pub use sqlite_store::SqliteStatusStore;
pub use store::{StatusError, StatusStore};
pub use types::{JobState, JobStatus, StatusCounts, StatusUpdate, WriteOutcome};

use std::sync::Arc;

use crate::config::{Backend, StoreConfig};

/// Open the status store selected by the config.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn StatusStore>, StatusError> {
    match config.backend {
        Backend::Memory => Ok(Arc::new(MemoryStatusStore::new())),
        Backend::Sqlite => Ok(Arc::new(SqliteStatusStore::new(&config.path)?)),
    }
}
