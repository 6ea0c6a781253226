//! Roster optimizer collaborator.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpOptimizer;

/// Errors from an optimizer call. Every variant ends the job as FAILED.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// The request never got a response.
    #[error("optimizer request failed: {0}")]
    Transport(String),

    /// No response within the per-call bound.
    #[error("optimizer timed out after {0:?}")]
    Timeout(Duration),

    /// The optimizer answered with a non-success status.
    #[error("optimizer returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is not a usable result.
    #[error("invalid optimizer response: {0}")]
    InvalidResponse(String),
}

impl OptimizerError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizerError::Transport(_) => "transport",
            OptimizerError::Timeout(_) => "timeout",
            OptimizerError::Status { .. } => "status",
            OptimizerError::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<reqwest::Error> for OptimizerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OptimizerError::Transport(format!("timed out: {e}"))
        } else if e.is_decode() {
            OptimizerError::InvalidResponse(e.to_string())
        } else {
            OptimizerError::Transport(e.to_string())
        }
    }
}

/// Inputs for one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimizeRequest {
    pub flights_gcs: String,
    pub crew_gcs: String,
    pub start_date: String,
}

/// A successful optimization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeResult {
    /// Public locator of the produced roster; becomes the job's output_url.
    pub output_url: String,
    /// Storage locator of the same artifact, when the optimizer reports one.
    pub gcs_url: Option<String>,
}

/// The external roster optimizer.
///
/// Implementations do not need to bound their own run time; the dispatch
/// worker wraps every call in a timeout.
#[async_trait]
pub trait Optimizer: Send + Sync {
    fn name(&self) -> &str;

    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResult, OptimizerError>;
}
