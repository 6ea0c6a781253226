//! Mock optimizer for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::optimizer::{OptimizeRequest, OptimizeResult, Optimizer, OptimizerError};

/// Mock implementation of the Optimizer trait.
///
/// Succeeds by default with a result locator derived from the start date.
/// Every call is recorded, including failed ones.
///
/// # Example
///
/// ```rust,ignore
/// use aeroguard_core::testing::MockOptimizer;
///
/// let optimizer = MockOptimizer::new();
/// optimizer.set_output_url("https://storage/out/roster.csv").await;
///
/// // ... run a delivery through a DispatchWorker ...
///
/// assert_eq!(optimizer.call_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockOptimizer {
    calls: Arc<RwLock<Vec<OptimizeRequest>>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<OptimizerError>>>,
    /// Fixed result locator; derived from the request when unset.
    output_url: Arc<RwLock<Option<String>>>,
    /// Simulated run time.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOptimizer {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            output_url: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Locator the default success path produces for a request.
    pub fn default_output_url(request: &OptimizeRequest) -> String {
        format!(
            "https://storage.example.com/rosters/roster_{}.csv",
            request.start_date
        )
    }

    pub async fn recorded_calls(&self) -> Vec<OptimizeRequest> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: OptimizerError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_output_url(&self, url: impl Into<String>) {
        *self.output_url.write().await = Some(url.into());
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl Optimizer for MockOptimizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResult, OptimizerError> {
        self.calls.write().await.push(request.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let output_url = self
            .output_url
            .read()
            .await
            .clone()
            .unwrap_or_else(|| Self::default_output_url(request));

        Ok(OptimizeResult {
            output_url,
            gcs_url: None,
        })
    }
}
