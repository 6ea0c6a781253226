//! Testing utilities and mock implementations.
//!
//! Mocks for the optimizer, status reporting and the broker, so the whole
//! submit/dispatch path can run in-process without external services.
//!
//! # Example
//!
//! ```rust,ignore
//! use aeroguard_core::testing::{MockOptimizer, MockStatusReporter};
//!
//! let optimizer = MockOptimizer::new();
//! let reporter = MockStatusReporter::new();
//! reporter.fail_next_reports(1);
//! ```

mod mock_optimizer;
mod mock_queue;
mod mock_reporter;

pub use mock_optimizer::MockOptimizer;
pub use mock_queue::UnavailableQueue;
pub use mock_reporter::MockStatusReporter;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::job::{JobRequest, QueueMessage};

    /// A valid request against the default `gs` scheme.
    pub fn job_request(start_date: &str) -> JobRequest {
        JobRequest::new(
            "gs://aeroguard-inputs/flights.csv",
            "gs://aeroguard-inputs/crew.csv",
            start_date,
        )
    }

    /// Encoded envelope for a job id, as a worker would receive it.
    pub fn queue_payload(job_id: &str) -> Vec<u8> {
        let message = QueueMessage {
            job_id: job_id.to_string(),
            flights_gcs: "gs://aeroguard-inputs/flights.csv".to_string(),
            crew_gcs: "gs://aeroguard-inputs/crew.csv".to_string(),
            start_date: "2024-01-01".to_string(),
        };
        serde_json::to_vec(&message).unwrap_or_default()
    }
}
