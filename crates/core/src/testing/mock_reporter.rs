//! Status reporter with injectable transport failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::reporter::{LocalStatusReporter, ReportError, StatusReporter};
use crate::status::{JobState, JobStatus, MemoryStatusStore, StatusStore, StatusUpdate, WriteOutcome};

/// Reporter backed by an in-memory store that can be told to fail.
///
/// Failed reports return [`ReportError::Transport`] and leave the store untouched.
#[derive(Default)]
pub struct MockStatusReporter {
    store: Arc<MemoryStatusStore>,
    reports: Arc<RwLock<Vec<(String, JobState)>>>,
    fail_next: AtomicUsize,
}

impl MockStatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> Arc<MemoryStatusStore> {
        Arc::clone(&self.store)
    }

    /// Make the next `n` reports fail as unreachable.
    pub fn fail_next_reports(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Every report that reached the store, in order.
    pub async fn recorded_reports(&self) -> Vec<(String, JobState)> {
        self.reports.read().await.clone()
    }
}

#[async_trait]
impl StatusReporter for MockStatusReporter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn report(
        &self,
        job_id: &str,
        update: StatusUpdate,
    ) -> Result<WriteOutcome, ReportError> {
        let should_fail = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ReportError::Transport("injected failure".to_string()));
        }

        let state = update.state();
        let outcome = LocalStatusReporter::new(self.store.clone())
            .report(job_id, update)
            .await?;
        self.reports.write().await.push((job_id.to_string(), state));
        Ok(outcome)
    }

    async fn query(&self, job_id: &str) -> Result<JobStatus, ReportError> {
        Ok(self.store.get(job_id)?)
    }
}
