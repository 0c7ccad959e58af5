//! Arbiter configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Candidate validation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum symbol length.
    #[serde(default = "default_max_symbol_len")]
    pub max_symbol_len: usize,
    /// Maximum tolerated future skew of `created_at` (ms).
    #[serde(default = "default_max_clock_skew_ms")]
    pub max_clock_skew_ms: i64,
    /// Candidates older than this are rejected as stale (seconds).
    #[serde(default = "default_max_candidate_age_secs")]
    pub max_age_secs: u64,
}

/// Upper bound for `max_clock_skew_ms` (1 hour).
pub const MAX_CLOCK_SKEW_LIMIT_MS: i64 = 60 * 60 * 1000;

/// Upper bound for `max_age_secs` (30 days).
pub const MAX_CANDIDATE_AGE_LIMIT_SECS: u64 = 30 * 24 * 60 * 60;

fn default_max_symbol_len() -> usize {
    32
}

fn default_max_clock_skew_ms() -> i64 {
    5_000
}

fn default_max_candidate_age_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_symbol_len: default_max_symbol_len(),
            max_clock_skew_ms: default_max_clock_skew_ms(),
            max_age_secs: default_max_candidate_age_secs(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_symbol_len == 0 {
            return Err("max_symbol_len must be positive".to_string());
        }
        if !(0..=MAX_CLOCK_SKEW_LIMIT_MS).contains(&self.max_clock_skew_ms) {
            return Err(format!(
                "max_clock_skew_ms ({}) must be within [0, {}]",
                self.max_clock_skew_ms, MAX_CLOCK_SKEW_LIMIT_MS
            ));
        }
        if self.max_age_secs == 0 || self.max_age_secs > MAX_CANDIDATE_AGE_LIMIT_SECS {
            return Err(format!(
                "max_age_secs ({}) must be within [1, {}]",
                self.max_age_secs, MAX_CANDIDATE_AGE_LIMIT_SECS
            ));
        }
        Ok(())
    }

    /// Future skew as a duration, clamped to the allowed range.
    pub fn max_clock_skew(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.max_clock_skew_ms.clamp(0, MAX_CLOCK_SKEW_LIMIT_MS))
    }

    /// Maximum candidate age, clamped to the allowed range.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_age_secs.min(MAX_CANDIDATE_AGE_LIMIT_SECS) as i64)
    }
}

/// Near-duplicate filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Two candidates farther apart than this are never duplicates (seconds).
    #[serde(default = "default_dedup_window_secs")]
    pub window_secs: u64,
    /// Max |Δconfidence| for a duplicate.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: Decimal,
    /// Indicator-set Jaccard similarity above which candidates are duplicates.
    #[serde(default = "default_jaccard_threshold")]
    pub jaccard_threshold: Decimal,
    /// How long admitted candidates stay in the pool (seconds).
    #[serde(default = "default_pool_retention_secs")]
    pub retention_secs: u64,
}

fn default_dedup_window_secs() -> u64 {
    15 * 60
}

fn default_confidence_threshold() -> Decimal {
    Decimal::new(3, 2) // 0.03
}

fn default_jaccard_threshold() -> Decimal {
    Decimal::new(85, 2) // 0.85
}

fn default_pool_retention_secs() -> u64 {
    60 * 60
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_secs: default_dedup_window_secs(),
            confidence_threshold: default_confidence_threshold(),
            jaccard_threshold: default_jaccard_threshold(),
            retention_secs: default_pool_retention_secs(),
        }
    }
}

impl DedupConfig {
    /// Validate configuration values.
    ///
    /// The pool must retain candidates at least as long as the comparison
    /// window, otherwise the window would silently shrink.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_secs == 0 {
            return Err("window_secs must be positive".to_string());
        }
        if self.retention_secs < self.window_secs {
            return Err(format!(
                "retention_secs ({}) must be >= window_secs ({})",
                self.retention_secs, self.window_secs
            ));
        }
        if self.confidence_threshold.is_sign_negative() {
            return Err(format!(
                "confidence_threshold ({}) must be non-negative",
                self.confidence_threshold
            ));
        }
        if self.jaccard_threshold.is_sign_negative() || self.jaccard_threshold > Decimal::ONE {
            return Err(format!(
                "jaccard_threshold ({}) must be within [0, 1]",
                self.jaccard_threshold
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs as i64)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_secs as i64)
    }
}

/// Arbitration thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    /// Minimum quality score to open (or replace into) a position.
    #[serde(default = "default_min_quality_threshold")]
    pub min_quality_threshold: Decimal,
    /// Global cap on concurrently active positions.
    #[serde(default = "default_max_active_positions")]
    pub max_active_positions: usize,
    /// Minimum confidence gain over a same-direction incumbent.
    #[serde(default = "default_enhance_gap_threshold")]
    pub enhance_gap_threshold: Decimal,
    /// Quality gain over a same-direction incumbent must exceed this.
    #[serde(default = "default_enhance_quality_gap")]
    pub enhance_quality_gap: Decimal,
    /// Upper bound for `enhancement_ratio`.
    #[serde(default = "default_enhancement_ratio_cap")]
    pub enhancement_ratio_cap: Decimal,
    /// Minimum confidence gain over an opposite-direction incumbent.
    #[serde(default = "default_replace_gap_threshold")]
    pub replace_gap_threshold: Decimal,
    /// Size hint for a full-confidence position (fraction of capital).
    #[serde(default = "default_max_position_fraction")]
    pub max_position_fraction: Decimal,
    /// Active positions older than this are swept (seconds).
    #[serde(default = "default_position_retention_secs")]
    pub position_retention_secs: u64,
}

fn default_min_quality_threshold() -> Decimal {
    Decimal::from(70)
}

fn default_max_active_positions() -> usize {
    10
}

fn default_enhance_gap_threshold() -> Decimal {
    Decimal::new(8, 2) // 0.08
}

fn default_enhance_quality_gap() -> Decimal {
    Decimal::from(5)
}

fn default_enhancement_ratio_cap() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_replace_gap_threshold() -> Decimal {
    Decimal::new(15, 2) // 0.15
}

fn default_max_position_fraction() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

fn default_position_retention_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            min_quality_threshold: default_min_quality_threshold(),
            max_active_positions: default_max_active_positions(),
            enhance_gap_threshold: default_enhance_gap_threshold(),
            enhance_quality_gap: default_enhance_quality_gap(),
            enhancement_ratio_cap: default_enhancement_ratio_cap(),
            replace_gap_threshold: default_replace_gap_threshold(),
            max_position_fraction: default_max_position_fraction(),
            position_retention_secs: default_position_retention_secs(),
        }
    }
}

impl ArbitrationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_quality_threshold.is_sign_negative()
            || self.min_quality_threshold > Decimal::from(100)
        {
            return Err(format!(
                "min_quality_threshold ({}) must be within [0, 100]",
                self.min_quality_threshold
            ));
        }
        if self.max_active_positions == 0 {
            return Err("max_active_positions must be positive".to_string());
        }
        if self.enhance_gap_threshold.is_sign_negative()
            || self.replace_gap_threshold.is_sign_negative()
        {
            return Err("gap thresholds must be non-negative".to_string());
        }
        if self.max_position_fraction <= Decimal::ZERO || self.max_position_fraction > Decimal::ONE
        {
            return Err(format!(
                "max_position_fraction ({}) must be within (0, 1]",
                self.max_position_fraction
            ));
        }
        if self.position_retention_secs == 0 {
            return Err("position_retention_secs must be positive".to_string());
        }
        Ok(())
    }

    pub fn position_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.position_retention_secs as i64)
    }
}

/// Descending quality thresholds for the urgency tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityThresholds {
    #[serde(default = "default_critical")]
    pub critical: Decimal,
    #[serde(default = "default_high")]
    pub high: Decimal,
    #[serde(default = "default_medium")]
    pub medium: Decimal,
}

fn default_critical() -> Decimal {
    Decimal::from(90)
}

fn default_high() -> Decimal {
    Decimal::from(80)
}

fn default_medium() -> Decimal {
    Decimal::from(70)
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            critical: default_critical(),
            high: default_high(),
            medium: default_medium(),
        }
    }
}

impl PriorityThresholds {
    /// Thresholds must be strictly descending.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.critical > self.high && self.high > self.medium) {
            return Err(format!(
                "priority thresholds must be strictly descending (critical={}, high={}, medium={})",
                self.critical, self.high, self.medium
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ValidationConfig::default().validate().is_ok());
        assert!(DedupConfig::default().validate().is_ok());
        assert!(ArbitrationConfig::default().validate().is_ok());
        assert!(PriorityThresholds::default().validate().is_ok());
    }

    #[test]
    fn test_default_reference_values() {
        let dedup = DedupConfig::default();
        assert_eq!(dedup.confidence_threshold, dec!(0.03));
        assert_eq!(dedup.jaccard_threshold, dec!(0.85));
        assert_eq!(dedup.window(), chrono::Duration::minutes(15));

        let arb = ArbitrationConfig::default();
        assert_eq!(arb.enhance_gap_threshold, dec!(0.08));
        assert_eq!(arb.replace_gap_threshold, dec!(0.15));
        assert_eq!(arb.position_retention(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_validation_limits_bounded() {
        let config = ValidationConfig {
            max_clock_skew_ms: i64::MAX,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("max_clock_skew_ms"));
        assert_eq!(config.max_clock_skew(), chrono::Duration::hours(1));

        let config = ValidationConfig {
            max_age_secs: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("max_age_secs"));
        assert_eq!(config.max_age(), chrono::Duration::days(30));

        let config = ValidationConfig {
            max_age_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_shorter_than_window_rejected() {
        let config = DedupConfig {
            window_secs: 900,
            retention_secs: 600,
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("retention_secs"));
    }

    #[test]
    fn test_jaccard_threshold_bounds() {
        let config = DedupConfig {
            jaccard_threshold: dec!(1.2),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_thresholds_must_descend() {
        let thresholds = PriorityThresholds {
            critical: dec!(80),
            high: dec!(80),
            medium: dec!(70),
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = ArbitrationConfig {
            max_active_positions: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
