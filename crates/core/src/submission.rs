//! Job submission: validate, record QUEUED, publish.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::job::{Job, JobRequest, ValidationError};
use crate::metrics;
use crate::queue::{JobQueue, QueueError};
use crate::reporter::{ReportError, StatusReporter};
use crate::status::StatusUpdate;

/// Errors from [`SubmissionService::submit`].
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request is invalid; nothing was stored or published.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The QUEUED status could not be recorded; nothing was published.
    #[error("failed to record job status: {0}")]
    Status(#[from] ReportError),

    /// The envelope could not be serialized.
    #[error("failed to encode job envelope: {0}")]
    Encode(#[from] serde_json::Error),

    /// The broker did not confirm the publish. The QUEUED record is kept.
    #[error("failed to publish job {job_id}: {source}")]
    Queue {
        job_id: String,
        #[source]
        source: QueueError,
    },
}

impl SubmitError {
    fn reason(&self) -> &'static str {
        match self {
            SubmitError::Validation(_) => "validation",
            SubmitError::Status(_) => "status",
            SubmitError::Encode(_) => "encode",
            SubmitError::Queue { .. } => "queue",
        }
    }
}

/// A job that was recorded and handed to the broker.
#[derive(Debug, Clone)]
pub struct SubmittedJob {
    pub job: Job,
    pub message_id: String,
}

/// Accepts job requests from clients.
pub struct SubmissionService {
    reporter: Arc<dyn StatusReporter>,
    queue: Arc<dyn JobQueue>,
    schemes: Vec<String>,
}

impl SubmissionService {
    pub fn new(
        reporter: Arc<dyn StatusReporter>,
        queue: Arc<dyn JobQueue>,
        schemes: Vec<String>,
    ) -> Self {
        Self {
            reporter,
            queue,
            schemes,
        }
    }

    /// Validate a request, record it as QUEUED and publish it.
    ///
    /// The status is written before publishing, so a worker can never see a
    /// job whose QUEUED write has yet to land.
    pub async fn submit(&self, request: &JobRequest) -> Result<SubmittedJob, SubmitError> {
        let result = self.try_submit(request).await;
        match &result {
            Ok(submitted) => {
                metrics::JOBS_SUBMITTED.inc();
                info!(
                    job_id = %submitted.job.id,
                    message_id = %submitted.message_id,
                    start_date = %submitted.job.start_date,
                    "Job queued"
                );
            }
            Err(e) => {
                metrics::SUBMISSION_FAILURES
                    .with_label_values(&[e.reason()])
                    .inc();
                warn!(error = %e, "Job submission failed");
            }
        }
        result
    }

    async fn try_submit(&self, request: &JobRequest) -> Result<SubmittedJob, SubmitError> {
        let job = Job::from_request(request, &self.schemes)?;
        let payload = job.to_message().encode()?;

        self.reporter.report(&job.id, StatusUpdate::Queued).await?;

        let message_id = self
            .queue
            .publish(payload)
            .await
            .map_err(|source| SubmitError::Queue {
                job_id: job.id.clone(),
                source,
            })?;

        Ok(SubmittedJob { job, message_id })
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::job::QueueMessage;
    use crate::queue::InMemoryQueue;
    use crate::reporter::LocalStatusReporter;
    use crate::status::{JobState, MemoryStatusStore, StatusStore};
    use crate::testing::UnavailableQueue;

    struct Harness {
        store: Arc<MemoryStatusStore>,
        queue: Arc<InMemoryQueue>,
        service: SubmissionService,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStatusStore::new());
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(60)));
        let service = SubmissionService::new(
            Arc::new(LocalStatusReporter::new(store.clone())),
            queue.clone(),
            vec!["gs".to_string()],
        );
        Harness {
            store,
            queue,
            service,
        }
    }

    #[tokio::test]
    async fn test_submit_records_and_publishes() {
        let h = harness();
        let request = JobRequest::new("gs://in/f.csv", "gs://in/c.csv", "2024-01-01");

        let submitted = h.service.submit(&request).await.unwrap();

        assert_eq!(h.store.get(&submitted.job.id).unwrap().state, JobState::Queued);

        let delivery = h.queue.receive().await.unwrap().unwrap();
        assert_eq!(delivery.message_id, submitted.message_id);
        let message = QueueMessage::decode(&delivery.payload).unwrap();
        assert_eq!(message.job_id, submitted.job.id);
        assert_eq!(message.flights_gcs, "gs://in/f.csv");
        assert_eq!(message.crew_gcs, "gs://in/c.csv");
        assert_eq!(message.start_date, "2024-01-01");
    }

    #[tokio::test]
    async fn test_invalid_request_creates_nothing() {
        let h = harness();
        let request = JobRequest::new("s3://in/f.csv", "gs://in/c.csv", "2024-01-01");

        let err = h.service.submit(&request).await.unwrap_err();

        assert!(matches!(err, SubmitError::Validation(_)));
        assert_eq!(h.store.counts().unwrap().total(), 0);
        assert_eq!(h.queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_queued_record() {
        let store = Arc::new(MemoryStatusStore::new());
        let service = SubmissionService::new(
            Arc::new(LocalStatusReporter::new(store.clone())),
            Arc::new(UnavailableQueue),
            vec!["gs".to_string()],
        );
        let request = JobRequest::new("gs://in/f.csv", "gs://in/c.csv", "2024-01-01");

        let err = service.submit(&request).await.unwrap_err();

        let SubmitError::Queue { job_id, .. } = err else {
            panic!("expected queue error, got {err:?}");
        };
        assert_eq!(store.get(&job_id).unwrap().state, JobState::Queued);
    }

    #[tokio::test]
    async fn test_each_submit_gets_new_id() {
        let h = harness();
        let request = JobRequest::new("gs://in/f.csv", "gs://in/c.csv", "2024-01-01");

        let a = h.service.submit(&request).await.unwrap();
        let b = h.service.submit(&request).await.unwrap();

        assert_ne!(a.job.id, b.job.id);
        assert_eq!(h.queue.depth().await.unwrap(), 2);
    }
}
