//! Status reporting for the submission path and dispatch workers.
//!
//! A worker either shares the status store with the API ([`LocalStatusReporter`])
//! or reports through the status update endpoint ([`HttpStatusReporter`]).

mod http;
mod local;

use async_trait::async_trait;
use thiserror::Error;

use crate::status::{JobStatus, StatusUpdate, WriteOutcome};

pub use http::HttpStatusReporter;
pub use local::LocalStatusReporter;

/// Errors from reporting or querying a status.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The status could not be delivered; retrying later may succeed.
    #[error("status backend unreachable: {0}")]
    Transport(String),

    /// The status backend refused the write; retrying will not help.
    #[error("status update rejected: {0}")]
    Rejected(String),
}

impl ReportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::Transport(_))
    }
}

/// Writes and reads job statuses.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    fn name(&self) -> &str;

    /// Record a status. An absorbed write is an outcome, not an error.
    async fn report(&self, job_id: &str, update: StatusUpdate)
        -> Result<WriteOutcome, ReportError>;

    /// Read a status; unseen ids come back as UNKNOWN.
    async fn query(&self, job_id: &str) -> Result<JobStatus, ReportError>;
}
