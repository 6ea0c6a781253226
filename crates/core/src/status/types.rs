//! Job status data types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StatusError;

/// Lifecycle state of a job.
///
/// ```text
/// QUEUED -> PROCESSING -> DONE
///                     \-> FAILED
/// ```
///
/// `UNKNOWN` is only ever synthesized on read for ids that were never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Processing,
    Done,
    Failed,
    Unknown,
}

impl JobState {
    /// Every state that can be stored.
    pub const STORED: [JobState; 4] = [
        JobState::Queued,
        JobState::Processing,
        JobState::Done,
        JobState::Failed,
    ];

    /// Returns true for DONE and FAILED.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Whether a record currently in `self` may be overwritten with `next`.
    ///
    /// A terminal record only accepts another terminal write.
    pub fn admits(&self, next: JobState) -> bool {
        !self.is_terminal() || next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "QUEUED",
            JobState::Processing => "PROCESSING",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
            JobState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QUEUED" => Ok(JobState::Queued),
            "PROCESSING" => Ok(JobState::Processing),
            "DONE" => Ok(JobState::Done),
            "FAILED" => Ok(JobState::Failed),
            "UNKNOWN" => Ok(JobState::Unknown),
            other => Err(StatusError::InvalidUpdate(format!("unknown state '{other}'"))),
        }
    }
}

/// The status record returned to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(rename = "status")]
    pub state: JobState,
    /// Result locator, present only when DONE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
}

impl JobStatus {
    pub fn unknown() -> Self {
        Self {
            state: JobState::Unknown,
            output_url: None,
        }
    }
}

/// A status write. Only DONE carries a result locator, and UNKNOWN cannot be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Queued,
    Processing,
    Done { output_url: String },
    Failed,
}

impl StatusUpdate {
    /// Build an update from loosely-typed wire parts.
    pub fn from_parts(state: JobState, output_url: Option<String>) -> Result<Self, StatusError> {
        let output_url = output_url.filter(|u| !u.trim().is_empty());
        match (state, output_url) {
            (JobState::Done, Some(output_url)) => Ok(StatusUpdate::Done { output_url }),
            (JobState::Done, None) => Err(StatusError::InvalidUpdate(
                "DONE requires an output_url".to_string(),
            )),
            (JobState::Unknown, _) => Err(StatusError::InvalidUpdate(
                "UNKNOWN cannot be written".to_string(),
            )),
            (state, Some(_)) => Err(StatusError::InvalidUpdate(format!(
                "{state} cannot carry an output_url"
            ))),
            (JobState::Queued, None) => Ok(StatusUpdate::Queued),
            (JobState::Processing, None) => Ok(StatusUpdate::Processing),
            (JobState::Failed, None) => Ok(StatusUpdate::Failed),
        }
    }

    pub fn state(&self) -> JobState {
        match self {
            StatusUpdate::Queued => JobState::Queued,
            StatusUpdate::Processing => JobState::Processing,
            StatusUpdate::Done { .. } => JobState::Done,
            StatusUpdate::Failed => JobState::Failed,
        }
    }

    pub fn output_url(&self) -> Option<&str> {
        match self {
            StatusUpdate::Done { output_url } => Some(output_url),
            _ => None,
        }
    }

    pub fn into_status(self) -> JobStatus {
        let state = self.state();
        let output_url = match self {
            StatusUpdate::Done { output_url } => Some(output_url),
            _ => None,
        };
        JobStatus { state, output_url }
    }
}

/// Result of a status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The record now holds the written status.
    Applied,
    /// The record was terminal and the write was non-terminal; nothing changed.
    Absorbed,
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Applied => "applied",
            WriteOutcome::Absorbed => "absorbed",
        }
    }
}

/// Number of stored jobs in each state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub queued: u64,
    pub processing: u64,
    pub done: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn get(&self, state: JobState) -> u64 {
        match state {
            JobState::Queued => self.queued,
            JobState::Processing => self.processing,
            JobState::Done => self.done,
            JobState::Failed => self.failed,
            JobState::Unknown => 0,
        }
    }

    pub(crate) fn add(&mut self, state: JobState, n: u64) {
        match state {
            JobState::Queued => self.queued += n,
            JobState::Processing => self.processing += n,
            JobState::Done => self.done += n,
            JobState::Failed => self.failed += n,
            JobState::Unknown => {}
        }
    }

    pub fn total(&self) -> u64 {
        self.queued + self.processing + self.done + self.failed
    }
}
