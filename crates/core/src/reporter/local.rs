//! Reporter writing straight into a shared status store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ReportError, StatusReporter};
use crate::metrics;
use crate::status::{JobStatus, StatusError, StatusStore, StatusUpdate, WriteOutcome};

impl From<StatusError> for ReportError {
    fn from(e: StatusError) -> Self {
        match e {
            StatusError::InvalidUpdate(msg) => ReportError::Rejected(msg),
            StatusError::Database(msg) => ReportError::Transport(msg),
        }
    }
}

/// Reporter for processes that own the status store.
pub struct LocalStatusReporter {
    store: Arc<dyn StatusStore>,
}

impl LocalStatusReporter {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }
}

#[async_trait]
impl StatusReporter for LocalStatusReporter {
    fn name(&self) -> &str {
        "local"
    }

    async fn report(
        &self,
        job_id: &str,
        update: StatusUpdate,
    ) -> Result<WriteOutcome, ReportError> {
        let state = update.state();
        let outcome = self.store.put(job_id, update)?;

        metrics::STATUS_WRITES_TOTAL
            .with_label_values(&[state.as_str(), outcome.as_str()])
            .inc();

        if !outcome.is_applied() {
            debug!(job_id = %job_id, state = %state, "Status write absorbed by terminal record");
        }

        Ok(outcome)
    }

    async fn query(&self, job_id: &str) -> Result<JobStatus, ReportError> {
        Ok(self.store.get(job_id)?)
    }
}
