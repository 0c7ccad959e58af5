//! Dispatch error types.

use epl_core::ChannelKind;
use thiserror::Error;

/// Failure reported by (or on behalf of) a channel adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("{channel} send timed out after {timeout_ms}ms")]
    Timeout { channel: ChannelKind, timeout_ms: u64 },

    #[error("{channel} send failed: {reason}")]
    SendFailed { channel: ChannelKind, reason: String },
}

pub type ChannelResult<T> = Result<T, ChannelError>;
