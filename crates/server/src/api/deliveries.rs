//! Broker push endpoint.
//!
//! The broker redelivers any message answered with a non-2xx status, so every
//! outcome that must not come back (processed, duplicate, malformed) is a 200.
//! Only a status write that could not be recorded answers 503.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::warn;

use aeroguard_core::{DeliveryOutcome, PushRequest};

use super::jobs::JobErrorResponse;
use crate::state::AppState;

/// Handle one pushed delivery
pub async fn push_delivery(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<DeliveryOutcome>), (StatusCode, Json<JobErrorResponse>)> {
    let Some(worker) = state.worker() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(JobErrorResponse {
                error: "no optimizer configured".to_string(),
                job_id: None,
            }),
        ));
    };

    // An unparseable body is treated like a push without a message.
    let request = serde_json::from_slice::<PushRequest>(&body).unwrap_or_else(|e| {
        warn!("Unparseable push body: {}", e);
        PushRequest::default()
    });

    let outcome = worker.handle_push(&request).await;
    let status = if outcome.should_ack() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok((status, Json(outcome)))
}
