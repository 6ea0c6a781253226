//! Job queue trait and errors.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker could not be reached or refused the operation.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The message id is not leased (already acked, or its lease expired).
    #[error("unknown message: {0}")]
    UnknownMessage(String),
}

/// A message handed to a consumer.
///
/// The message stays leased to that consumer until it is acked or nacked,
/// or until the visibility timeout passes and it is redelivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub payload: Vec<u8>,
    /// Delivery count, starting at 1.
    pub attempt: u32,
}

/// At-least-once message broker for job envelopes.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Backend name for logs and `/health`.
    fn name(&self) -> &str;

    /// Publish a payload, returning once the broker has accepted it.
    async fn publish(&self, payload: Vec<u8>) -> Result<String, QueueError>;

    /// Lease the oldest visible message, if any.
    async fn receive(&self) -> Result<Option<Delivery>, QueueError>;

    /// Remove a leased message for good.
    async fn ack(&self, message_id: &str) -> Result<(), QueueError>;

    /// Release a leased message for immediate redelivery.
    async fn nack(&self, message_id: &str) -> Result<(), QueueError>;

    /// Renew a live lease for one more visibility timeout.
    ///
    /// Fails with [`QueueError::UnknownMessage`] once the lease has lapsed.
    async fn extend(&self, message_id: &str) -> Result<(), QueueError>;

    /// How long a lease lasts without renewal.
    fn visibility_timeout(&self) -> Duration;

    /// Number of messages not yet acknowledged, leased ones included.
    async fn depth(&self) -> Result<usize, QueueError>;
}
