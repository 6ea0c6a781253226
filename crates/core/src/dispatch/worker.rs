//! Per-delivery processing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::types::DeliveryOutcome;
use crate::job::{PushRequest, QueueMessage};
use crate::metrics;
use crate::optimizer::{OptimizeRequest, OptimizeResult, Optimizer, OptimizerError};
use crate::reporter::{ReportError, StatusReporter};
use crate::status::{StatusUpdate, WriteOutcome};

/// Turns one delivered envelope into a terminal status.
///
/// Shared by the pull runner and the push endpoint. At most `concurrency`
/// optimizer calls run at once across every caller of the same worker.
pub struct DispatchWorker {
    reporter: Arc<dyn StatusReporter>,
    optimizer: Arc<dyn Optimizer>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl DispatchWorker {
    pub fn new(
        reporter: Arc<dyn StatusReporter>,
        optimizer: Arc<dyn Optimizer>,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            reporter,
            optimizer,
            timeout,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle a push request as delivered by the broker.
    pub async fn handle_push(&self, request: &PushRequest) -> DeliveryOutcome {
        match request.payload() {
            Ok(payload) => self.handle_payload(&payload).await,
            Err(e) => {
                warn!(
                    message_id = request.message_id().unwrap_or("-"),
                    kind = e.kind(),
                    error = %e,
                    "Dropping undecodable push request"
                );
                Self::record(DeliveryOutcome::Dropped {
                    reason: e.kind().to_string(),
                })
            }
        }
    }

    /// Handle the raw bytes of one delivery.
    pub async fn handle_payload(&self, payload: &[u8]) -> DeliveryOutcome {
        let outcome = match QueueMessage::decode(payload) {
            Ok(message) => self.process(message).await,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Dropping undecodable envelope");
                DeliveryOutcome::Dropped {
                    reason: e.to_string(),
                }
            }
        };
        Self::record(outcome)
    }

    async fn process(&self, message: QueueMessage) -> DeliveryOutcome {
        let job_id = message.job_id.clone();

        match self.reporter.report(&job_id, StatusUpdate::Processing).await {
            Ok(WriteOutcome::Applied) => {}
            Ok(WriteOutcome::Absorbed) => {
                debug!(job_id = %job_id, "Job already terminal, skipping redelivery");
                return DeliveryOutcome::Duplicate { job_id };
            }
            Err(e) => return Self::report_failed(job_id, e),
        }

        let request = OptimizeRequest {
            flights_gcs: message.flights_gcs,
            crew_gcs: message.crew_gcs,
            start_date: message.start_date,
        };

        let (update, outcome) = match self.run_optimizer(&request).await {
            Ok(result) => (
                StatusUpdate::Done {
                    output_url: result.output_url.clone(),
                },
                DeliveryOutcome::Done {
                    job_id: job_id.clone(),
                    output_url: result.output_url,
                },
            ),
            Err(e) => {
                warn!(job_id = %job_id, kind = e.kind(), error = %e, "Optimizer failed");
                (
                    StatusUpdate::Failed,
                    DeliveryOutcome::Failed {
                        job_id: job_id.clone(),
                        reason: e.to_string(),
                    },
                )
            }
        };

        match self.reporter.report(&job_id, update).await {
            Ok(_) => outcome,
            Err(e) => Self::report_failed(job_id, e),
        }
    }

    /// Call the optimizer under the worker's timeout.
    ///
    /// The timeout also covers the wait for a concurrency permit, so the time
    /// between the PROCESSING write and the terminal write never exceeds it
    /// by more than the status writes themselves.
    async fn run_optimizer(
        &self,
        request: &OptimizeRequest,
    ) -> Result<OptimizeResult, OptimizerError> {
        let start = Instant::now();
        let call = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| OptimizerError::Transport(format!("worker closed: {e}")))?;
            self.optimizer.optimize(request).await
        };

        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(OptimizerError::Timeout(self.timeout)),
        };

        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::OPTIMIZER_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    fn report_failed(job_id: String, error: ReportError) -> DeliveryOutcome {
        if error.is_retryable() {
            warn!(job_id = %job_id, error = %error, "Status write failed, releasing delivery");
            DeliveryOutcome::Retry {
                job_id,
                reason: error.to_string(),
            }
        } else {
            warn!(job_id = %job_id, error = %error, "Status write rejected, dropping delivery");
            DeliveryOutcome::Dropped {
                reason: error.to_string(),
            }
        }
    }

    fn record(outcome: DeliveryOutcome) -> DeliveryOutcome {
        metrics::DELIVERIES_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();

        match &outcome {
            DeliveryOutcome::Done { job_id, output_url } => {
                info!(job_id = %job_id, output_url = %output_url, "Job done");
            }
            DeliveryOutcome::Failed { job_id, .. } => {
                info!(job_id = %job_id, "Job failed");
            }
            DeliveryOutcome::Duplicate { job_id } => {
                info!(job_id = %job_id, "Duplicate delivery acknowledged");
            }
            DeliveryOutcome::Dropped { .. } | DeliveryOutcome::Retry { .. } => {}
        }

        outcome
    }
}
