//! Notification worker - sends notifications off the MQTT receive loop
//!
//! The receive loop enqueues composed payloads on a bounded mpsc channel and
//! never waits on the network. A single worker drains the channel in FIFO
//! order, so notifications for one object go out in the order their events
//! arrived. Failed sends are retried a bounded number of times and then
//! dropped; per-object state is not rolled back.

use crate::domain::notification::NotificationPayload;
use crate::infra::metrics::Metrics;
use crate::io::ntfy::Notifier;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// A notification waiting to be sent
#[derive(Debug)]
pub struct NotifyCmd {
    pub payload: NotificationPayload,
    /// When the command was enqueued (for queue delay measurement)
    pub enqueued_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before retry n is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, backoff: Duration::from_millis(500) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// Queue at capacity, notification dropped
    Full,
    /// Worker has stopped
    Closed,
}

/// Producer handle for the notification queue
#[derive(Clone)]
pub struct NotifySender {
    tx: mpsc::Sender<NotifyCmd>,
    metrics: Arc<Metrics>,
}

impl NotifySender {
    /// Enqueue without blocking
    pub fn enqueue(&self, payload: NotificationPayload) -> Result<(), EnqueueError> {
        let cmd = NotifyCmd { payload, enqueued_at: Instant::now() };
        match self.tx.try_send(cmd) {
            Ok(()) => {
                self.metrics.record_notification_queued();
                self.metrics.set_notify_queue_depth(self.depth());
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_notification_dropped();
                Err(EnqueueError::Full)
            }
            Err(TrySendError::Closed(_)) => Err(EnqueueError::Closed),
        }
    }

    fn depth(&self) -> u64 {
        (self.tx.max_capacity() - self.tx.capacity()) as u64
    }
}

/// Worker that delivers notifications one at a time
pub struct NotifyWorker {
    notifier: Arc<dyn Notifier>,
    cmd_rx: mpsc::Receiver<NotifyCmd>,
    metrics: Arc<Metrics>,
    retry: RetryPolicy,
}

impl NotifyWorker {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        cmd_rx: mpsc::Receiver<NotifyCmd>,
        metrics: Arc<Metrics>,
        retry: RetryPolicy,
    ) -> Self {
        Self { notifier, cmd_rx, metrics, retry }
    }

    /// Run the worker, processing commands until every sender is dropped
    pub async fn run(mut self) {
        info!(max_retries = %self.retry.max_retries, "notify_worker_started");

        while let Some(cmd) = self.cmd_rx.recv().await {
            self.metrics.set_notify_queue_depth(self.cmd_rx.len() as u64);
            let queue_delay_us = cmd.enqueued_at.elapsed().as_micros() as u64;
            self.deliver(&cmd.payload, queue_delay_us).await;
        }

        info!("notify_worker_stopped");
    }

    async fn deliver(&self, payload: &NotificationPayload, queue_delay_us: u64) {
        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            match self.notifier.send(payload).await {
                Ok(()) => {
                    let latency_us = start.elapsed().as_micros() as u64;
                    self.metrics.record_notification_sent(latency_us);
                    info!(
                        title = %payload.title,
                        attempts = %(attempt + 1),
                        queue_delay_us = %queue_delay_us,
                        send_latency_us = %latency_us,
                        "notification_sent"
                    );
                    return;
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        title = %payload.title,
                        attempt = %attempt,
                        error = %e,
                        "notification_send_retry"
                    );
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(e) => {
                    self.metrics.record_notification_failed();
                    error!(
                        title = %payload.title,
                        attempts = %(attempt + 1),
                        error = %e,
                        "notification_send_failed"
                    );
                    debug!(body = %payload.body, "notification_dropped");
                    return;
                }
            }
        }
    }
}

/// Create a notification channel and worker
///
/// Returns the sender (for the receive loop) and the worker (to be spawned)
pub fn create_notify_worker(
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,
    buffer_size: usize,
    retry: RetryPolicy,
) -> (NotifySender, NotifyWorker) {
    let (tx, cmd_rx) = mpsc::channel(buffer_size.max(1));
    let worker = NotifyWorker::new(notifier, cmd_rx, metrics.clone(), retry);
    (NotifySender { tx, metrics }, worker)
}
