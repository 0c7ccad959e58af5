//! Signal candidate types.
//!
//! A `SignalCandidate` is produced upstream (market data + indicator
//! pipelines) and is never mutated once it enters the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// Trade direction of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[serde(alias = "long", alias = "BUY", alias = "buy")]
    Long,
    #[serde(alias = "short", alias = "SELL", alias = "sell")]
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Self::Long),
            "SHORT" | "SELL" => Ok(Self::Short),
            _ => Err(CoreError::InvalidDirection(s.to_string())),
        }
    }
}

/// Unique candidate identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    /// Create a new unique candidate ID.
    ///
    /// Format: `sig_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("sig_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (producer-supplied id).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A proposed trade signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCandidate {
    /// Unique id within the process lifetime.
    pub id: CandidateId,
    /// Instrument symbol (e.g. "BTCUSDT").
    pub symbol: String,
    /// Proposed direction.
    pub direction: Direction,
    /// Confidence in [0, 1].
    pub confidence: Decimal,
    /// Upstream quality score in [0, 100].
    pub quality_score: Decimal,
    /// Names of indicators that contributed to the signal.
    #[serde(default)]
    pub indicators: BTreeSet<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Opaque market context captured by the producer.
    #[serde(default)]
    pub market_context: serde_json::Value,
}

impl SignalCandidate {
    /// Create a candidate stamped with a fresh id and the current time.
    pub fn new<I, S>(
        symbol: impl Into<String>,
        direction: Direction,
        confidence: Decimal,
        quality_score: Decimal,
        indicators: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: CandidateId::new(),
            symbol: symbol.into(),
            direction,
            confidence,
            quality_score,
            indicators: indicators.into_iter().map(Into::into).collect(),
            created_at: Utc::now(),
            market_context: serde_json::Value::Null,
        }
    }

    /// Replace the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Replace the id.
    #[must_use]
    pub fn with_id(mut self, id: CandidateId) -> Self {
        self.id = id;
        self
    }

    /// Attach a market context blob.
    #[must_use]
    pub fn with_market_context(mut self, context: serde_json::Value) -> Self {
        self.market_context = context;
        self
    }
}
