//! Prometheus metrics for the HTTP server.
//!
//! Request metrics are recorded by middleware. Job counts, queue depth and
//! runner state are gauges refreshed from the application state on every
//! scrape. Counters owned by the core crate (submissions, deliveries,
//! optimizer latency, status writes) are registered here as well.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

use aeroguard_core::JobState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "aeroguard_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aeroguard_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "aeroguard_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "aeroguard_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Job Metrics (collected on scrape)
// =============================================================================

/// Jobs currently recorded in each state.
pub static JOBS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("aeroguard_jobs_by_state", "Number of jobs in each state"),
        &["state"],
    )
    .unwrap()
});

/// Unacknowledged messages in the job queue.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "aeroguard_queue_depth",
        "Messages published but not yet acknowledged",
    )
    .unwrap()
});

/// Whether pull consumers run in this process (1) or not (0).
pub static DISPATCH_RUNNER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "aeroguard_dispatch_runner_running",
        "Whether the dispatch runner is running",
    )
    .unwrap()
});

/// Live consumer tasks.
pub static DISPATCH_CONSUMERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "aeroguard_dispatch_consumers",
        "Number of live dispatch consumer tasks",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Jobs and dispatch
    registry.register(Box::new(JOBS_BY_STATE.clone())).unwrap();
    registry.register(Box::new(QUEUE_DEPTH.clone())).unwrap();
    registry
        .register(Box::new(DISPATCH_RUNNER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(DISPATCH_CONSUMERS.clone()))
        .unwrap();

    // Core metrics (submission, dispatch, status writes)
    for metric in aeroguard_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges from the current application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.store().counts() {
        Ok(counts) => {
            for job_state in [
                JobState::Queued,
                JobState::Processing,
                JobState::Done,
                JobState::Failed,
            ] {
                JOBS_BY_STATE
                    .with_label_values(&[job_state.as_str()])
                    .set(counts.get(job_state) as i64);
            }
        }
        Err(e) => tracing::warn!("Failed to count jobs: {}", e),
    }

    if let Ok(depth) = state.queue().depth().await {
        QUEUE_DEPTH.set(depth as i64);
    }

    match state.runner() {
        Some(runner) => {
            let status = runner.status().await;
            DISPATCH_RUNNER_RUNNING.set(if status.running { 1 } else { 0 });
            DISPATCH_CONSUMERS.set(status.consumers as i64);
        }
        None => {
            DISPATCH_RUNNER_RUNNING.set(0);
            DISPATCH_CONSUMERS.set(0);
        }
    }
}

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_REGEX.replace_all(path, "{id}");
    let result = NUMERIC_REGEX.replace_all(&result, "/{id}$1");
    result.to_string()
}
