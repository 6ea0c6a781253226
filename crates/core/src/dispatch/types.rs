//! Types for the dispatch worker.

use serde::{Deserialize, Serialize};

/// What happened to one delivery.
///
/// Every variant except [`DeliveryOutcome::Retry`] is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The optimizer produced a result and DONE was recorded.
    Done { job_id: String, output_url: String },

    /// The optimizer failed and FAILED was recorded.
    Failed { job_id: String, reason: String },

    /// The job was already terminal; the optimizer was not called.
    Duplicate { job_id: String },

    /// The payload could not be used, or the status backend refused it.
    Dropped { reason: String },

    /// A status write could not be delivered; the message must come back.
    Retry { job_id: String, reason: String },
}

impl DeliveryOutcome {
    pub fn should_ack(&self) -> bool {
        !matches!(self, DeliveryOutcome::Retry { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Done { .. } => "done",
            DeliveryOutcome::Failed { .. } => "failed",
            DeliveryOutcome::Duplicate { .. } => "duplicate",
            DeliveryOutcome::Dropped { .. } => "dropped",
            DeliveryOutcome::Retry { .. } => "retry",
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Done { job_id, .. }
            | DeliveryOutcome::Failed { job_id, .. }
            | DeliveryOutcome::Duplicate { job_id }
            | DeliveryOutcome::Retry { job_id, .. } => Some(job_id),
            DeliveryOutcome::Dropped { .. } => None,
        }
    }
}

/// Current status of the dispatch runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerStatus {
    pub running: bool,
    /// Consumer tasks still alive.
    pub consumers: usize,
    /// Unacknowledged messages, when the queue could report it.
    pub queue_depth: Option<usize>,
}
