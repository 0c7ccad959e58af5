//! Candidate validation.

use crate::config::ValidationConfig;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use epl_core::SignalCandidate;
use rust_decimal::Decimal;

/// Rejects malformed candidates before they reach the dedup pool.
#[derive(Debug, Clone, Default)]
pub struct CandidateValidator {
    config: ValidationConfig,
}

impl CandidateValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate against the current wall clock.
    pub fn validate(&self, candidate: &SignalCandidate) -> Result<(), ValidationError> {
        self.validate_at(candidate, Utc::now())
    }

    /// Validate with an explicit `now` (timestamp checks).
    pub fn validate_at(
        &self,
        candidate: &SignalCandidate,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if candidate.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }

        self.validate_symbol(&candidate.symbol)?;

        if candidate.confidence < Decimal::ZERO || candidate.confidence > Decimal::ONE {
            return Err(ValidationError::ConfidenceOutOfRange(candidate.confidence));
        }

        if candidate.quality_score < Decimal::ZERO || candidate.quality_score > Decimal::from(100)
        {
            return Err(ValidationError::QualityOutOfRange(candidate.quality_score));
        }

        if candidate.indicators.iter().any(|name| name.trim().is_empty()) {
            return Err(ValidationError::BlankIndicator);
        }

        // An unrepresentable bound means nothing can lie beyond it
        let latest = now.checked_add_signed(self.config.max_clock_skew());
        if latest.is_some_and(|latest| candidate.created_at > latest) {
            return Err(ValidationError::FutureTimestamp {
                created_at: candidate.created_at,
                max_skew_ms: self.config.max_clock_skew().num_milliseconds(),
            });
        }

        let oldest = now.checked_sub_signed(self.config.max_age());
        if oldest.is_some_and(|oldest| candidate.created_at < oldest) {
            return Err(ValidationError::StaleTimestamp {
                created_at: candidate.created_at,
                max_age_secs: self.config.max_age().num_seconds(),
            });
        }

        Ok(())
    }

    fn validate_symbol(&self, symbol: &str) -> Result<(), ValidationError> {
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if symbol.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidSymbol {
                symbol: symbol.to_string(),
                reason: "contains whitespace".to_string(),
            });
        }
        if symbol.chars().count() > self.config.max_symbol_len {
            return Err(ValidationError::InvalidSymbol {
                symbol: symbol.to_string(),
                reason: format!("longer than {} chars", self.config.max_symbol_len),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use epl_core::{CandidateId, Direction};
    use rust_decimal_macros::dec;

    fn candidate() -> SignalCandidate {
        SignalCandidate::new("BTCUSDT", Direction::Long, dec!(0.8), dec!(85), ["rsi", "macd"])
    }

    #[test]
    fn test_valid_candidate_passes() {
        let validator = CandidateValidator::default();
        assert!(validator.validate(&candidate()).is_ok());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let validator = CandidateValidator::default();
        let mut c = candidate();
        c.confidence = dec!(1);
        c.quality_score = dec!(0);
        assert!(validator.validate(&c).is_ok());
    }

    #[test]
    fn test_confidence_out_of_range() {
        let validator = CandidateValidator::default();
        let mut c = candidate();
        c.confidence = dec!(1.01);
        assert_eq!(
            validator.validate(&c),
            Err(ValidationError::ConfidenceOutOfRange(dec!(1.01)))
        );
    }

    #[test]
    fn test_quality_out_of_range() {
        let validator = CandidateValidator::default();
        let mut c = candidate();
        c.quality_score = dec!(-1);
        let err = validator.validate(&c).unwrap_err();
        assert_eq!(err.field(), "quality_score");
    }

    #[test]
    fn test_symbol_rules() {
        let validator = CandidateValidator::default();

        let mut c = candidate();
        c.symbol = String::new();
        assert_eq!(validator.validate(&c), Err(ValidationError::EmptySymbol));

        c.symbol = "BTC USDT".to_string();
        assert_eq!(validator.validate(&c).unwrap_err().field(), "symbol");

        c.symbol = "X".repeat(33);
        assert!(validator.validate(&c).is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let validator = CandidateValidator::default();
        let c = candidate().with_id(CandidateId::from_string(""));
        assert_eq!(validator.validate(&c), Err(ValidationError::EmptyId));
    }

    #[test]
    fn test_blank_indicator_rejected() {
        let validator = CandidateValidator::default();
        let mut c = candidate();
        c.indicators.insert("  ".to_string());
        assert_eq!(validator.validate(&c), Err(ValidationError::BlankIndicator));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let validator = CandidateValidator::default();
        let now = Utc::now();
        let c = candidate().with_created_at(now + Duration::seconds(60));
        let err = validator.validate_at(&c, now).unwrap_err();
        assert_eq!(err.field(), "created_at");

        // Within skew is fine
        let c = candidate().with_created_at(now + Duration::seconds(2));
        assert!(validator.validate_at(&c, now).is_ok());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let validator = CandidateValidator::default();
        let now = Utc::now();

        let c = candidate().with_created_at(now - Duration::hours(25));
        let err = validator.validate_at(&c, now).unwrap_err();
        assert!(matches!(err, ValidationError::StaleTimestamp { .. }));
        assert_eq!(err.field(), "created_at");

        let c = candidate().with_created_at(now - Duration::hours(23));
        assert!(validator.validate_at(&c, now).is_ok());
    }

    #[test]
    fn test_extreme_timestamps_rejected_without_overflow() {
        let validator = CandidateValidator::new(ValidationConfig {
            max_clock_skew_ms: i64::MAX,
            max_age_secs: u64::MAX,
            ..Default::default()
        });
        let now = Utc::now();

        let c = candidate().with_created_at(DateTime::<Utc>::MIN_UTC);
        assert!(matches!(
            validator.validate_at(&c, now),
            Err(ValidationError::StaleTimestamp { .. })
        ));

        let c = candidate().with_created_at(DateTime::<Utc>::MAX_UTC);
        assert!(matches!(
            validator.validate_at(&c, now),
            Err(ValidationError::FutureTimestamp { .. })
        ));

        // Bounds themselves unrepresentable
        let c = candidate().with_created_at(DateTime::<Utc>::MIN_UTC);
        assert!(validator.validate_at(&c, DateTime::<Utc>::MAX_UTC).is_err());
        assert!(validator.validate_at(&c, DateTime::<Utc>::MIN_UTC).is_ok());
    }
}
