use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use aeroguard_core::{RunnerStatus, SanitizedConfig};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub queue: String,
    pub push_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerStatus>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let runner = match state.runner() {
        Some(runner) => Some(runner.status().await),
        None => None,
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        queue: state.queue().name().to_string(),
        push_enabled: state.worker().is_some(),
        runner,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
