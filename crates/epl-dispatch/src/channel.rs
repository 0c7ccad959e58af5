//! Channel adapter capability.
//!
//! Adapters implement `NotificationChannel`; the router only ever talks to
//! `Arc<dyn NotificationChannel>`. This allows for:
//! - Recording mocks in tests
//! - Log-only adapters for dry runs
//! - Real push / email / SMS backends injected by the host application

use crate::error::{ChannelError, ChannelResult};
use epl_core::{ChannelKind, NotificationMessage};
use epl_telemetry::Metrics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Delivery capability of one channel.
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Send a message.
    ///
    /// `Ok(true)` delivered, `Ok(false)` accepted but not delivered,
    /// `Err` on adapter failure.
    fn send(&self, message: NotificationMessage) -> BoxFuture<'_, ChannelResult<bool>>;
}

/// Arc wrapper for channel trait objects.
pub type DynChannel = Arc<dyn NotificationChannel>;

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    /// Adapter returned `Ok(false)`.
    Rejected,
    Failed(String),
    /// Message expired before it could be sent.
    Expired,
    /// Scheduled send cancelled by shutdown.
    Cancelled,
}

impl DeliveryStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::Failed(_) => "failed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Per-channel result reported by the router.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDelivery {
    pub channel: ChannelKind,
    pub status: DeliveryStatus,
}

/// Send `message` through `channel`, bounded by `timeout`.
///
/// Never returns an error: failures are logged, counted and reported as a
/// status. No retry.
pub async fn deliver(
    channel: &dyn NotificationChannel,
    message: NotificationMessage,
    timeout: Duration,
) -> ChannelDelivery {
    let kind = channel.kind();
    let message_id = message.id.clone();

    let status = if message.is_expired() {
        DeliveryStatus::Expired
    } else {
        match tokio::time::timeout(timeout, channel.send(message)).await {
            Ok(Ok(true)) => DeliveryStatus::Delivered,
            Ok(Ok(false)) => DeliveryStatus::Rejected,
            Ok(Err(e)) => DeliveryStatus::Failed(e.to_string()),
            Err(_) => DeliveryStatus::Failed(
                ChannelError::Timeout {
                    channel: kind,
                    timeout_ms: timeout.as_millis() as u64,
                }
                .to_string(),
            ),
        }
    };

    Metrics::channel_delivery(kind.as_str(), status.as_str());
    match &status {
        DeliveryStatus::Delivered => {
            debug!(channel = %kind, message_id = %message_id, "Notification delivered");
        }
        DeliveryStatus::Failed(reason) => {
            warn!(channel = %kind, message_id = %message_id, reason = %reason, "Notification delivery failed");
        }
        other => {
            info!(channel = %kind, message_id = %message_id, status = other.as_str(), "Notification not delivered");
        }
    }

    ChannelDelivery {
        channel: kind,
        status,
    }
}

/// Configured channels keyed by kind.
#[derive(Clone, Default)]
pub struct ChannelSet {
    channels: BTreeMap<ChannelKind, DynChannel>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel, replacing any previous one of the same kind.
    #[must_use]
    pub fn with(mut self, channel: DynChannel) -> Self {
        self.insert(channel);
        self
    }

    pub fn insert(&mut self, channel: DynChannel) {
        self.channels.insert(channel.kind(), channel);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&DynChannel> {
        self.channels.get(&kind)
    }

    pub fn all(&self) -> impl Iterator<Item = &DynChannel> {
        self.channels.values()
    }

    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.channels.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl std::fmt::Debug for ChannelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSet")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Adapter that writes messages to the log.
#[derive(Debug, Clone)]
pub struct LogChannel {
    kind: ChannelKind,
}

impl LogChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }
}

impl NotificationChannel for LogChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn send(&self, message: NotificationMessage) -> BoxFuture<'_, ChannelResult<bool>> {
        Box::pin(async move {
            info!(
                channel = %self.kind,
                message_id = %message.id,
                priority = %message.priority,
                title = %message.title,
                body = %message.body,
                "Notification"
            );
            Ok(true)
        })
    }
}

/// Recording adapter for tests.
#[derive(Debug)]
pub struct RecordingChannel {
    kind: ChannelKind,
    /// Recorded sends for verification.
    sent: parking_lot::Mutex<Vec<NotificationMessage>>,
    /// Error returned by every send while set.
    failure: parking_lot::Mutex<Option<ChannelError>>,
    /// Return `Ok(false)` while set.
    reject: AtomicBool,
    /// Artificial send latency.
    delay: parking_lot::Mutex<Option<Duration>>,
}

impl RecordingChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            sent: parking_lot::Mutex::new(Vec::new()),
            failure: parking_lot::Mutex::new(None),
            reject: AtomicBool::new(false),
            delay: parking_lot::Mutex::new(None),
        }
    }

    /// Make every subsequent send fail (or succeed again with `None`).
    pub fn set_failure(&self, failure: Option<ChannelError>) {
        *self.failure.lock() = failure;
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Get recorded sends.
    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn send(&self, message: NotificationMessage) -> BoxFuture<'_, ChannelResult<bool>> {
        let delay = *self.delay.lock();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let failure = self.failure.lock().clone();
            if let Some(err) = failure {
                return Err(err);
            }
            self.sent.lock().push(message);
            Ok(!self.reject.load(Ordering::SeqCst))
        })
    }
}
