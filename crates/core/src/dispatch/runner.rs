//! Pull-mode consumer loops.
//!
//! Each consumer task leases one message at a time, hands it to the shared
//! [`DispatchWorker`] and then acks or nacks it. The lease is renewed while
//! the worker runs, so a slow optimizer call never lets the broker hand the
//! same message to a second consumer. A delivery in progress is always
//! finished before a consumer exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::types::RunnerStatus;
use super::worker::DispatchWorker;
use crate::queue::{Delivery, JobQueue};

const MIN_RENEW_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `concurrency` consumer tasks against a queue.
pub struct DispatchRunner {
    worker: Arc<DispatchWorker>,
    queue: Arc<dyn JobQueue>,
    concurrency: usize,
    poll_interval: Duration,

    // Runtime state
    running: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl DispatchRunner {
    pub fn new(
        worker: Arc<DispatchWorker>,
        queue: Arc<dyn JobQueue>,
        concurrency: usize,
        poll_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            worker,
            queue,
            concurrency: concurrency.max(1),
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
            shutdown_tx,
        }
    }

    /// Start the consumer tasks.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Dispatch runner already running");
            return;
        }

        info!(
            queue = self.queue.name(),
            consumers = self.concurrency,
            "Starting dispatch runner"
        );

        let mut handles = self.handles.lock().await;
        for consumer in 0..self.concurrency {
            handles.push(self.spawn_consumer(consumer));
        }
    }

    /// Signal every consumer to stop and wait for in-flight deliveries.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Dispatch runner not running");
            return;
        }

        info!("Stopping dispatch runner");
        let _ = self.shutdown_tx.send(());

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("Consumer task panicked: {}", e);
            }
        }

        info!("Dispatch runner stopped");
    }

    pub async fn status(&self) -> RunnerStatus {
        let consumers = self
            .handles
            .lock()
            .await
            .iter()
            .filter(|h| !h.is_finished())
            .count();

        RunnerStatus {
            running: self.running.load(Ordering::Relaxed),
            consumers,
            queue_depth: self.queue.depth().await.ok(),
        }
    }

    fn spawn_consumer(&self, consumer: usize) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let worker = Arc::clone(&self.worker);
        let queue = Arc::clone(&self.queue);
        let poll_interval = self.poll_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(consumer, "Consumer started");
            while running.load(Ordering::Relaxed) {
                let idle = match queue.receive().await {
                    Ok(Some(delivery)) => {
                        Self::dispatch(&worker, queue.as_ref(), delivery).await;
                        false
                    }
                    Ok(None) => true,
                    Err(e) => {
                        warn!(consumer, "Failed to receive from queue: {}", e);
                        true
                    }
                };

                if idle {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(poll_interval) => {}
                    }
                }
            }
            debug!(consumer, "Consumer stopped");
        })
    }

    /// Renew three times per visibility timeout.
    fn renew_interval(queue: &dyn JobQueue) -> Duration {
        (queue.visibility_timeout() / 3).max(MIN_RENEW_INTERVAL)
    }

    async fn dispatch(worker: &DispatchWorker, queue: &dyn JobQueue, delivery: Delivery) {
        debug!(
            message_id = %delivery.message_id,
            attempt = delivery.attempt,
            "Received delivery"
        );

        let work = worker.handle_payload(&delivery.payload);
        tokio::pin!(work);

        let mut renew = tokio::time::interval(Self::renew_interval(queue));
        renew.tick().await;

        let outcome = loop {
            tokio::select! {
                outcome = &mut work => break outcome,
                _ = renew.tick() => {
                    if let Err(e) = queue.extend(&delivery.message_id).await {
                        warn!(
                            message_id = %delivery.message_id,
                            "Failed to renew lease: {}",
                            e
                        );
                    }
                }
            }
        };

        let result = if outcome.should_ack() {
            queue.ack(&delivery.message_id).await
        } else {
            queue.nack(&delivery.message_id).await
        };

        if let Err(e) = result {
            // The lease will expire and the message comes back; the store absorbs the repeat.
            warn!(
                message_id = %delivery.message_id,
                outcome = outcome.label(),
                "Failed to settle delivery: {}",
                e
            );
        }
    }
}
