//! Arbitration outcome types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::candidate::{CandidateId, Direction};
use crate::error::CoreError;

/// What the engine does with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Supersede an opposite-direction active position.
    Replace,
    /// Strengthen a same-direction active position.
    Enhance,
    /// Open a position for an idle instrument.
    NewOrder,
    /// Take no action.
    Ignore,
}

impl Action {
    /// All actions in counter order.
    pub const ALL: [Action; 4] = [Self::Replace, Self::Enhance, Self::NewOrder, Self::Ignore];

    /// Stable index for fixed-size counter arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Replace => 0,
            Self::Enhance => 1,
            Self::NewOrder => 2,
            Self::Ignore => 3,
        }
    }

    /// Whether the action installs the candidate in the registry.
    pub fn is_actionable(self) -> bool {
        !matches!(self, Self::Ignore)
    }

    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Enhance => "enhance",
            Self::NewOrder => "new_order",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "REPLACE"),
            Self::Enhance => write!(f, "ENHANCE"),
            Self::NewOrder => write!(f, "NEW_ORDER"),
            Self::Ignore => write!(f, "IGNORE"),
        }
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "REPLACE" => Ok(Self::Replace),
            "ENHANCE" => Ok(Self::Enhance),
            "NEW_ORDER" => Ok(Self::NewOrder),
            "IGNORE" => Ok(Self::Ignore),
            _ => Err(CoreError::InvalidAction(s.to_string())),
        }
    }
}

/// Dissemination urgency tier.
///
/// Ordering follows urgency: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// All priorities, most urgent first.
    pub const ALL: [Priority; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Stable index for fixed-size counter arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(CoreError::InvalidPriority(s.to_string())),
        }
    }
}

/// Execution hints attached to a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// ENHANCE only: `min(confidence_gap * 2, 0.5)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement_ratio: Option<Decimal>,
    /// NEW_ORDER / REPLACE: suggested fraction of capital for the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_fraction: Option<Decimal>,
    /// REPLACE only: the superseded position should be closed first.
    #[serde(default)]
    pub close_related: bool,
}

/// Arbitration outcome for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Candidate this decision was made for.
    pub candidate_id: CandidateId,
    /// Instrument symbol.
    pub symbol: String,
    /// Candidate direction.
    pub direction: Direction,
    pub action: Action,
    pub priority: Priority,
    /// Human-readable explanation.
    pub reasoning: String,
    /// Signed confidence difference against the incumbent (or the candidate's
    /// own confidence when there is no incumbent).
    pub confidence_delta: Decimal,
    /// Superseded or strengthened candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_signal_id: Option<CandidateId>,
    #[serde(default)]
    pub execution_params: ExecutionParams,
    /// Decision timestamp.
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    /// Whether the decision changed the registry.
    pub fn is_actionable(&self) -> bool {
        self.action.is_actionable()
    }
}
