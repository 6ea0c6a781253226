//! At-least-once job queue backends.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryQueue;
pub use sqlite::SqliteQueue;
pub use traits::{Delivery, JobQueue, QueueError};

use std::sync::Arc;

use crate::config::{Backend, QueueConfig};

/// Open the queue backend selected by the config.
pub fn open_queue(config: &QueueConfig) -> Result<Arc<dyn JobQueue>, QueueError> {
    match config.backend {
        Backend::Memory => Ok(Arc::new(InMemoryQueue::new(config.visibility_timeout()))),
        Backend::Sqlite => Ok(Arc::new(SqliteQueue::new(
            &config.path,
            config.visibility_timeout(),
        )?)),
    }
}
