//! Cancellable scheduled dissemination work.
//!
//! Delayed sends and side tasks run on a `TaskTracker`; every task also
//! watches a shared `CancellationToken`. Work is in-memory and best effort:
//! shutdown cancels whatever has not fired yet and waits for the rest.

use crate::channel::{deliver, DeliveryStatus, DynChannel};
use epl_core::NotificationMessage;
use epl_telemetry::Metrics;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

#[derive(Debug)]
pub struct DispatchScheduler {
    shutdown_token: CancellationToken,
    tracker: TaskTracker,
    send_timeout: Duration,
}

impl DispatchScheduler {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            shutdown_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            send_timeout,
        }
    }

    /// Send `message` through `channel` after `delay`.
    ///
    /// Returns `false` if the scheduler is shutting down.
    pub fn schedule_after(
        &self,
        delay: Duration,
        channel: DynChannel,
        message: NotificationMessage,
    ) -> bool {
        if self.is_shutting_down() {
            return false;
        }

        let token = self.shutdown_token.clone();
        let timeout = self.send_timeout;
        Metrics::scheduled_inc();
        self.tracker.spawn(async move {
            let kind = channel.kind();
            tokio::select! {
                () = token.cancelled() => {
                    Metrics::channel_delivery(kind.as_str(), DeliveryStatus::Cancelled.as_str());
                    debug!(channel = %kind, message_id = %message.id, "Scheduled notification cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    deliver(channel.as_ref(), message, timeout).await;
                }
            }
            Metrics::scheduled_dec();
        });
        true
    }

    /// Run `task` in the background until it completes or shutdown.
    ///
    /// Returns `false` if the scheduler is shutting down.
    pub fn spawn_side_task<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_shutting_down() {
            return false;
        }

        let token = self.shutdown_token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = task => {}
            }
        });
        true
    }

    /// Tasks spawned and not yet finished.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Wait for all current tasks without cancelling them.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel pending work and wait for every task to finish.
    pub async fn shutdown(&self) {
        let pending = self.pending();
        self.shutdown_token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!(cancelled_or_finished = pending, "Dispatch scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RecordingChannel;
    use epl_core::{ChannelKind, Priority};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn message() -> NotificationMessage {
        NotificationMessage::new(
            Priority::High,
            vec![ChannelKind::Email],
            "title",
            "body",
            serde_json::Value::Null,
            chrono::Duration::minutes(15),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_send_fires_after_delay() {
        let scheduler = DispatchScheduler::new(Duration::from_secs(5));
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));

        assert!(scheduler.schedule_after(Duration::from_secs(300), email.clone(), message()));
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(email.sent_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.flush().await;
        assert_eq!(email.sent_count(), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_sends() {
        let scheduler = DispatchScheduler::new(Duration::from_secs(5));
        let email = Arc::new(RecordingChannel::new(ChannelKind::Email));

        scheduler.schedule_after(Duration::from_secs(300), email.clone(), message());
        scheduler.shutdown().await;

        assert_eq!(email.sent_count(), 0);
        assert_eq!(scheduler.pending(), 0);
        assert!(!scheduler.schedule_after(Duration::from_secs(1), email.clone(), message()));
    }

    #[tokio::test]
    async fn test_side_task_runs() {
        let scheduler = DispatchScheduler::new(Duration::from_secs(5));
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        assert!(scheduler.spawn_side_task(async move {
            flag.store(true, Ordering::SeqCst);
        }));
        scheduler.flush().await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
