//! Jobs: what clients submit and what travels through the queue.

mod envelope;
mod types;

pub use envelope::{DecodeError, PushMessage, PushRequest, QueueMessage};
pub use types::{Job, JobRequest, LocatorError, StorageLocator, ValidationError};
