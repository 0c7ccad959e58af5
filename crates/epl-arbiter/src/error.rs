//! Arbiter error types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a candidate is rejected before entering the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("candidate id is empty")]
    EmptyId,

    #[error("symbol is empty")]
    EmptySymbol,

    #[error("invalid symbol {symbol:?}: {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(Decimal),

    #[error("quality score {0} outside [0, 100]")]
    QualityOutOfRange(Decimal),

    #[error("indicator names must not be blank")]
    BlankIndicator,

    #[error("created_at {created_at} is more than {max_skew_ms}ms in the future")]
    FutureTimestamp {
        created_at: DateTime<Utc>,
        max_skew_ms: i64,
    },

    #[error("created_at {created_at} is more than {max_age_secs}s in the past")]
    StaleTimestamp {
        created_at: DateTime<Utc>,
        max_age_secs: i64,
    },
}

impl ValidationError {
    /// Short field name for logs and metrics.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyId => "id",
            Self::EmptySymbol | Self::InvalidSymbol { .. } => "symbol",
            Self::ConfidenceOutOfRange(_) => "confidence",
            Self::QualityOutOfRange(_) => "quality_score",
            Self::BlankIndicator => "indicators",
            Self::FutureTimestamp { .. } | Self::StaleTimestamp { .. } => "created_at",
        }
    }
}
