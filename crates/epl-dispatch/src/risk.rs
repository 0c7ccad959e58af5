//! Exposure assessment for CRITICAL decisions.

use chrono::{DateTime, Utc};
use epl_core::{Action, CandidateId, Decision, SignalCandidate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Elevated,
    Severe,
}

impl RiskLevel {
    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elevated => "elevated",
            Self::Severe => "severe",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elevated => write!(f, "ELEVATED"),
            Self::Severe => write!(f, "SEVERE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub candidate_id: CandidateId,
    pub symbol: String,
    pub action: Action,
    pub level: RiskLevel,
    pub confidence: Decimal,
    pub size_fraction: Option<Decimal>,
    /// Conditions that raised the level to SEVERE.
    pub reasons: Vec<String>,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// SEVERE when the decision reverses a position or confidence is at or
    /// above `severe_confidence`; ELEVATED otherwise.
    pub fn assess(
        candidate: &SignalCandidate,
        decision: &Decision,
        severe_confidence: Decimal,
    ) -> Self {
        let mut reasons = Vec::new();
        if decision.action == Action::Replace {
            reasons.push(match &decision.related_signal_id {
                Some(id) => format!("reverses active position {id}"),
                None => "reverses active position".to_string(),
            });
        }
        if candidate.confidence >= severe_confidence {
            reasons.push(format!(
                "confidence {} >= {}",
                candidate.confidence, severe_confidence
            ));
        }

        let level = if reasons.is_empty() {
            RiskLevel::Elevated
        } else {
            RiskLevel::Severe
        };

        Self {
            candidate_id: candidate.id.clone(),
            symbol: candidate.symbol.clone(),
            action: decision.action,
            level,
            confidence: candidate.confidence,
            size_fraction: decision.execution_params.size_fraction,
            reasons,
            assessed_at: Utc::now(),
        }
    }
}
