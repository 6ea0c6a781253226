//! Status storage trait and errors.

use thiserror::Error;

use super::{JobStatus, StatusCounts, StatusUpdate, WriteOutcome};

/// Error type for status operations.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The write is not a valid status (e.g. DONE without a locator).
    #[error("invalid status update: {0}")]
    InvalidUpdate(String),

    /// Storage backend failure.
    #[error("database error: {0}")]
    Database(String),
}

/// Storage for the current status of each job.
///
/// Implementations must be safe to share between the submission path and any
/// number of concurrent workers, and must apply the non-regression check and the
/// write as one atomic step.
pub trait StatusStore: Send + Sync {
    /// Write a status.
    ///
    /// Returns [`WriteOutcome::Absorbed`] without changing anything when the
    /// stored status is terminal and `update` is not.
    fn put(&self, job_id: &str, update: StatusUpdate) -> Result<WriteOutcome, StatusError>;

    /// Read a status, or UNKNOWN when the id was never written.
    fn get(&self, job_id: &str) -> Result<JobStatus, StatusError>;

    /// Count stored jobs per state.
    fn counts(&self) -> Result<StatusCounts, StatusError>;
}
