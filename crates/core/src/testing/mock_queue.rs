//! Queue that refuses every operation.

use std::time::Duration;

use async_trait::async_trait;

use crate::queue::{Delivery, JobQueue, QueueError};

/// Stand-in for a broker that is down.
#[derive(Debug, Default)]
pub struct UnavailableQueue;

#[async_trait]
impl JobQueue for UnavailableQueue {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn publish(&self, _payload: Vec<u8>) -> Result<String, QueueError> {
        Err(QueueError::Unavailable("broker offline".to_string()))
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        Err(QueueError::Unavailable("broker offline".to_string()))
    }

    async fn ack(&self, _message_id: &str) -> Result<(), QueueError> {
        Err(QueueError::Unavailable("broker offline".to_string()))
    }

    async fn nack(&self, _message_id: &str) -> Result<(), QueueError> {
        Err(QueueError::Unavailable("broker offline".to_string()))
    }

    async fn extend(&self, _message_id: &str) -> Result<(), QueueError> {
        Err(QueueError::Unavailable("broker offline".to_string()))
    }

    fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        Err(QueueError::Unavailable("broker offline".to_string()))
    }
}
