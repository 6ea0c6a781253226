//! Prometheus metrics for core components.
//!
//! Submission, dispatch, status writes and optimizer calls. The server crate
//! registers these alongside its HTTP metrics.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Submission
// =============================================================================

/// Jobs accepted and published.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "aeroguard_jobs_submitted_total",
        "Total jobs accepted and published to the queue",
    )
    .unwrap()
});

/// Submissions that did not produce a queued job.
pub static SUBMISSION_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "aeroguard_submission_failures_total",
            "Total failed submissions",
        ),
        &["reason"], // "validation", "status", "queue", "encode"
    )
    .unwrap()
});

// =============================================================================
// Dispatch
// =============================================================================

/// Deliveries handled by outcome.
pub static DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aeroguard_deliveries_total", "Total deliveries handled"),
        &["outcome"], // "done", "failed", "duplicate", "dropped", "retry"
    )
    .unwrap()
});

/// Optimizer call duration in seconds.
pub static OPTIMIZER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "aeroguard_optimizer_duration_seconds",
            "Duration of optimizer calls",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["result"], // "success", "transport", "timeout", "status", "invalid_response"
    )
    .unwrap()
});

// =============================================================================
// Status
// =============================================================================

/// Status writes by state and outcome.
pub static STATUS_WRITES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("aeroguard_status_writes_total", "Total status writes"),
        &["state", "outcome"], // outcome: "applied", "absorbed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(SUBMISSION_FAILURES.clone()),
        Box::new(DELIVERIES_TOTAL.clone()),
        Box::new(OPTIMIZER_DURATION.clone()),
        Box::new(STATUS_WRITES_TOTAL.clone()),
    ]
}
