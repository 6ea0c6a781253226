use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{deliveries, handlers, jobs};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Writes to job state require a caller credential; reads do not
    let auth = middleware::from_fn_with_state(Arc::clone(&state), auth_middleware);

    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Jobs
        .route("/jobs", post(jobs::submit_job).route_layer(auth.clone()))
        .route(
            "/jobs/{id}/status",
            get(jobs::get_job_status).merge(post(jobs::update_job_status).route_layer(auth)),
        )
        // Broker push deliveries
        .route("/deliveries/push", post(deliveries::push_delivery))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
