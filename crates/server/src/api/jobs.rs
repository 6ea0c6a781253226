//! Job submission and status API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use aeroguard_core::{JobRequest, JobState, JobStatus, ReportError, StatusUpdate, SubmitError};

use super::middleware::AuthCaller;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for an accepted job
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: JobState,
}

/// Current status of a job
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

/// Request body for a status write
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    /// State name; parsed by hand so an unknown name is a 400.
    pub status: String,
    #[serde(default)]
    pub output_url: Option<String>,
}

/// Result of a status write
#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub job_id: String,
    /// False when the write was absorbed by a terminal state.
    pub applied: bool,
    /// State recorded after the write.
    pub status: JobState,
}

/// Error response for job operations
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

type JobError = (StatusCode, Json<JobErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> JobError {
    (
        status,
        Json(JobErrorResponse {
            error: message.into(),
            job_id: None,
        }),
    )
}

fn report_error(e: ReportError) -> JobError {
    match e {
        ReportError::Rejected(msg) => error(StatusCode::BAD_REQUEST, msg),
        ReportError::Transport(msg) => error(StatusCode::SERVICE_UNAVAILABLE, msg),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a roster-optimization job
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    Json(body): Json<JobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), JobError> {
    match state.submission().submit(&body).await {
        Ok(submitted) => {
            info!(
                job_id = %submitted.job.id,
                caller = %caller.subject,
                "Accepted job"
            );
            Ok((
                StatusCode::ACCEPTED,
                Json(SubmitJobResponse {
                    job_id: submitted.job.id,
                    status: JobState::Queued,
                }),
            ))
        }
        Err(SubmitError::Validation(e)) => Err(error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(SubmitError::Status(e)) => Err(report_error(e)),
        Err(SubmitError::Encode(e)) => {
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(SubmitError::Queue { job_id, source }) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(JobErrorResponse {
                error: format!("failed to publish job: {source}"),
                job_id: Some(job_id),
            }),
        )),
    }
}

/// Get the status of a job; unseen ids are UNKNOWN
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, JobError> {
    let status = state.reporter().query(&id).await.map_err(report_error)?;
    Ok(Json(JobStatusResponse { job_id: id, status }))
}

/// Record a status for a job
pub async fn update_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<UpdateStatusResponse>, JobError> {
    let update = JobState::from_str(&body.status)
        .and_then(|s| StatusUpdate::from_parts(s, body.output_url))
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let requested = update.state();
    let outcome = state
        .reporter()
        .report(&id, update)
        .await
        .map_err(report_error)?;

    // An absorbed write leaves the terminal state that was already there.
    let current = if outcome.is_applied() {
        requested
    } else {
        match state.reporter().query(&id).await {
            Ok(status) => status.state,
            Err(e) => {
                warn!(job_id = %id, "Failed to read back status: {}", e);
                requested
            }
        }
    };

    Ok(Json(UpdateStatusResponse {
        job_id: id,
        applied: outcome.is_applied(),
        status: current,
    }))
}
