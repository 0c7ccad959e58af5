//! Priority classification.

use crate::config::PriorityThresholds;
use epl_core::Priority;
use rust_decimal::Decimal;

/// Maps a quality score to an urgency tier.
///
/// Step function over descending thresholds; no state, no side effects.
#[derive(Debug, Clone, Default)]
pub struct PriorityClassifier {
    thresholds: PriorityThresholds,
}

impl PriorityClassifier {
    pub fn new(thresholds: PriorityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, quality_score: Decimal) -> Priority {
        if quality_score >= self.thresholds.critical {
            Priority::Critical
        } else if quality_score >= self.thresholds.high {
            Priority::High
        } else if quality_score >= self.thresholds.medium {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn thresholds(&self) -> &PriorityThresholds {
        &self.thresholds
    }
}
