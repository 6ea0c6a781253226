//! In-process job queue.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::{Delivery, JobQueue, QueueError};

#[derive(Debug)]
struct Pending {
    id: String,
    payload: Vec<u8>,
    attempts: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Pending>,
    leased: HashMap<String, (Pending, Instant)>,
}

impl QueueState {
    /// Put every lease past its deadline back at the head of the queue.
    fn expire_leases(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .leased
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some((pending, _)) = self.leased.remove(&id) {
                debug!(message_id = %id, "Lease expired, redelivering");
                self.ready.push_front(pending);
            }
        }
    }
}

/// Queue living in process memory.
///
/// Gives the same at-least-once contract as the durable backends while the
/// process is up; everything is lost on restart.
#[derive(Debug)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    visibility_timeout: Duration,
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            visibility_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<String, QueueError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.lock().ready.push_back(Pending {
            id: id.clone(),
            payload,
            attempts: 0,
        });
        Ok(id)
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let now = Instant::now();
        let mut state = self.lock();
        state.expire_leases(now);

        let Some(mut pending) = state.ready.pop_front() else {
            return Ok(None);
        };

        pending.attempts += 1;
        let delivery = Delivery {
            message_id: pending.id.clone(),
            payload: pending.payload.clone(),
            attempt: pending.attempts,
        };
        state
            .leased
            .insert(pending.id.clone(), (pending, now + self.visibility_timeout));

        Ok(Some(delivery))
    }

    async fn ack(&self, message_id: &str) -> Result<(), QueueError> {
        self.lock()
            .leased
            .remove(message_id)
            .map(|_| ())
            .ok_or_else(|| QueueError::UnknownMessage(message_id.to_string()))
    }

    async fn nack(&self, message_id: &str) -> Result<(), QueueError> {
        let mut state = self.lock();
        let (pending, _) = state
            .leased
            .remove(message_id)
            .ok_or_else(|| QueueError::UnknownMessage(message_id.to_string()))?;
        state.ready.push_back(pending);
        Ok(())
    }

    async fn extend(&self, message_id: &str) -> Result<(), QueueError> {
        let now = Instant::now();
        match self.lock().leased.get_mut(message_id) {
            Some((_, deadline)) if *deadline > now => {
                *deadline = now + self.visibility_timeout;
                Ok(())
            }
            _ => Err(QueueError::UnknownMessage(message_id.to_string())),
        }
    }

    fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        let state = self.lock();
        Ok(state.ready.len() + state.leased.len())
    }
}
