//! Error types for epl-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
