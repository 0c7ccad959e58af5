//! Arbitration between a candidate and the symbol's active position.
//!
//! Decision table:
//!
//! | Registry state        | Condition                                        | Action    |
//! |-----------------------|--------------------------------------------------|-----------|
//! | empty                 | quality >= min && slot reserved under cap        | NEW_ORDER |
//! | same direction        | conf gap >= enhance gap && quality gap > 5       | ENHANCE   |
//! | opposite direction    | conf gap >= replace gap && quality >= min        | REPLACE   |
//! | anything else         |                                                  | IGNORE    |
//!
//! The verdict is computed and committed while holding the registry entry for
//! the symbol, so no other decision for that symbol can interleave.

use crate::classifier::PriorityClassifier;
use crate::config::{ArbitrationConfig, PriorityThresholds};
use crate::registry::{ActivePosition, ActivePositionRegistry};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use epl_core::{Action, CandidateId, Decision, ExecutionParams, SignalCandidate};
use epl_telemetry::Metrics;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Arbitration result before it is stamped into a `Decision`.
#[derive(Debug, Clone)]
struct Verdict {
    action: Action,
    reasoning: String,
    confidence_delta: Decimal,
    related_signal_id: Option<CandidateId>,
    execution_params: ExecutionParams,
}

impl Verdict {
    fn ignore(confidence_delta: Decimal, reasoning: String) -> Self {
        Self {
            action: Action::Ignore,
            reasoning,
            confidence_delta,
            related_signal_id: None,
            execution_params: ExecutionParams::default(),
        }
    }
}

/// Per-symbol arbitration engine.
#[derive(Debug)]
pub struct ArbitrationEngine {
    config: ArbitrationConfig,
    classifier: PriorityClassifier,
    registry: Arc<ActivePositionRegistry>,
}

impl ArbitrationEngine {
    pub fn new(config: ArbitrationConfig, thresholds: PriorityThresholds) -> Self {
        let registry = Arc::new(ActivePositionRegistry::new(config.position_retention()));
        Self::with_registry(config, PriorityClassifier::new(thresholds), registry)
    }

    /// Build around an existing registry.
    pub fn with_registry(
        config: ArbitrationConfig,
        classifier: PriorityClassifier,
        registry: Arc<ActivePositionRegistry>,
    ) -> Self {
        Self {
            config,
            classifier,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ActivePositionRegistry> {
        &self.registry
    }

    pub fn classifier(&self) -> &PriorityClassifier {
        &self.classifier
    }

    pub fn config(&self) -> &ArbitrationConfig {
        &self.config
    }

    /// Decide what to do with `candidate`, updating the registry.
    pub fn decide(&self, candidate: &SignalCandidate) -> Decision {
        self.decide_at(candidate, Utc::now())
    }

    /// Same as [`decide`](Self::decide) with an explicit decision time.
    pub fn decide_at(&self, candidate: &SignalCandidate, now: DateTime<Utc>) -> Decision {
        let priority = self.classifier.classify(candidate.quality_score);

        let verdict = match self.registry.positions.entry(candidate.symbol.clone()) {
            Entry::Vacant(vacant) => {
                let verdict = self.evaluate_idle(candidate);
                if verdict.action != Action::NewOrder {
                    verdict
                } else if self.registry.try_reserve(self.config.max_active_positions) {
                    vacant.insert(ActivePosition::new(candidate.clone(), now, Action::NewOrder));
                    verdict
                } else {
                    Verdict::ignore(
                        candidate.confidence,
                        format!(
                            "active position cap reached ({}/{})",
                            self.registry.len(),
                            self.config.max_active_positions
                        ),
                    )
                }
            }
            Entry::Occupied(mut occupied) => {
                let incumbent = occupied.get();
                if incumbent.candidate.symbol != candidate.symbol {
                    self.internal_state_error(
                        candidate,
                        format!(
                            "registry entry for {} holds candidate {} for {}",
                            candidate.symbol, incumbent.candidate.id, incumbent.candidate.symbol
                        ),
                    )
                } else {
                    let verdict = self.evaluate_against(candidate, incumbent);
                    match verdict.action {
                        Action::Enhance | Action::Replace => {
                            // ENHANCE overwrites the incumbent wholesale; nothing is merged.
                            occupied.insert(ActivePosition::new(
                                candidate.clone(),
                                now,
                                verdict.action,
                            ));
                            verdict
                        }
                        Action::Ignore => verdict,
                        Action::NewOrder => self.internal_state_error(
                            candidate,
                            "NEW_ORDER evaluated while a position is active".to_string(),
                        ),
                    }
                }
            }
        };

        Metrics::active_positions(self.registry.len());
        Metrics::decision(verdict.action.as_str(), priority.as_str());

        debug!(
            symbol = %candidate.symbol,
            candidate_id = %candidate.id,
            action = %verdict.action,
            priority = %priority,
            confidence_delta = %verdict.confidence_delta,
            reasoning = %verdict.reasoning,
            "Arbitration decision"
        );

        Decision {
            candidate_id: candidate.id.clone(),
            symbol: candidate.symbol.clone(),
            direction: candidate.direction,
            action: verdict.action,
            priority,
            reasoning: verdict.reasoning,
            confidence_delta: verdict.confidence_delta,
            related_signal_id: verdict.related_signal_id,
            execution_params: verdict.execution_params,
            decided_at: now,
        }
    }

    /// No active position for the symbol.
    fn evaluate_idle(&self, candidate: &SignalCandidate) -> Verdict {
        let min_quality = self.config.min_quality_threshold;
        if candidate.quality_score < min_quality {
            return Verdict::ignore(
                candidate.confidence,
                format!(
                    "quality {} below minimum {}",
                    candidate.quality_score, min_quality
                ),
            );
        }

        Verdict {
            action: Action::NewOrder,
            reasoning: format!(
                "no active position for {}; quality {} >= {}",
                candidate.symbol, candidate.quality_score, min_quality
            ),
            confidence_delta: candidate.confidence,
            related_signal_id: None,
            execution_params: ExecutionParams {
                size_fraction: Some(self.size_fraction(candidate)),
                ..Default::default()
            },
        }
    }

    /// An active position exists for the symbol.
    fn evaluate_against(&self, candidate: &SignalCandidate, incumbent: &ActivePosition) -> Verdict {
        let current = &incumbent.candidate;
        let confidence_gap = candidate.confidence - current.confidence;

        if candidate.direction == current.direction {
            let quality_gap = candidate.quality_score - current.quality_score;
            if confidence_gap >= self.config.enhance_gap_threshold
                && quality_gap > self.config.enhance_quality_gap
            {
                let ratio = (confidence_gap * Decimal::TWO).min(self.config.enhancement_ratio_cap);
                return Verdict {
                    action: Action::Enhance,
                    reasoning: format!(
                        "same-direction confidence gap {} >= {} and quality gap {} > {}",
                        confidence_gap,
                        self.config.enhance_gap_threshold,
                        quality_gap,
                        self.config.enhance_quality_gap
                    ),
                    confidence_delta: confidence_gap,
                    related_signal_id: Some(current.id.clone()),
                    execution_params: ExecutionParams {
                        enhancement_ratio: Some(ratio),
                        ..Default::default()
                    },
                };
            }
            return Verdict::ignore(
                confidence_gap,
                format!(
                    "insufficient same-direction improvement over {}: confidence gap {} (need >= {}), quality gap {} (need > {})",
                    current.id,
                    confidence_gap,
                    self.config.enhance_gap_threshold,
                    quality_gap,
                    self.config.enhance_quality_gap
                ),
            );
        }

        let min_quality = self.config.min_quality_threshold;
        if confidence_gap >= self.config.replace_gap_threshold
            && candidate.quality_score >= min_quality
        {
            return Verdict {
                action: Action::Replace,
                reasoning: format!(
                    "opposite-direction confidence gap {} >= {} and quality {} >= {}",
                    confidence_gap, self.config.replace_gap_threshold, candidate.quality_score, min_quality
                ),
                confidence_delta: confidence_gap,
                related_signal_id: Some(current.id.clone()),
                execution_params: ExecutionParams {
                    size_fraction: Some(self.size_fraction(candidate)),
                    close_related: true,
                    ..Default::default()
                },
            };
        }

        Verdict::ignore(
            confidence_gap,
            format!(
                "insufficient gap to reverse {} {}: confidence gap {} (need >= {}), quality {} (min {})",
                current.direction,
                current.id,
                confidence_gap,
                self.config.replace_gap_threshold,
                candidate.quality_score,
                min_quality
            ),
        )
    }

    fn size_fraction(&self, candidate: &SignalCandidate) -> Decimal {
        candidate.confidence * self.config.max_position_fraction
    }

    fn internal_state_error(&self, candidate: &SignalCandidate, detail: String) -> Verdict {
        Metrics::internal_state_error();
        warn!(
            symbol = %candidate.symbol,
            candidate_id = %candidate.id,
            detail = %detail,
            "Inconsistent registry state, degrading to IGNORE"
        );
        Verdict::ignore(Decimal::ZERO, format!("internal state error: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epl_core::{Direction, Priority};
    use rust_decimal_macros::dec;

    fn engine() -> ArbitrationEngine {
        ArbitrationEngine::new(ArbitrationConfig::default(), PriorityThresholds::default())
    }

    fn candidate(symbol: &str, direction: Direction, confidence: Decimal, quality: Decimal) -> SignalCandidate {
        SignalCandidate::new(symbol, direction, confidence, quality, ["rsi", "macd"])
    }

    #[test]
    fn test_new_order_when_idle() {
        let engine = engine();
        let a = candidate("BTCUSDT", Direction::Long, dec!(0.80), dec!(85));

        let decision = engine.decide(&a);
        assert_eq!(decision.action, Action::NewOrder);
        assert_eq!(decision.priority, Priority::High);
        assert_eq!(decision.confidence_delta, dec!(0.80));
        assert_eq!(decision.execution_params.size_fraction, Some(dec!(0.0800)));
        assert_eq!(engine.registry().get("BTCUSDT").unwrap().candidate.id, a.id);
    }

    #[test]
    fn test_low_quality_idle_is_ignored() {
        let engine = engine();
        let c = candidate("ETHUSDT", Direction::Long, dec!(0.50), dec!(40));

        let decision = engine.decide(&c);
        assert_eq!(decision.action, Action::Ignore);
        assert_eq!(decision.priority, Priority::Low);
        assert!(decision.reasoning.contains("quality 40 below minimum 70"));
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_replace_on_strong_reversal() {
        let engine = engine();
        let a = candidate("BTCUSDT", Direction::Long, dec!(0.80), dec!(85));
        let b = candidate("BTCUSDT", Direction::Short, dec!(0.97), dec!(90));

        engine.decide(&a);
        let decision = engine.decide(&b);
        assert_eq!(decision.action, Action::Replace);
        assert_eq!(decision.priority, Priority::Critical);
        assert_eq!(decision.confidence_delta, dec!(0.17));
        assert_eq!(decision.related_signal_id, Some(a.id.clone()));
        assert!(decision.execution_params.close_related);

        let held = engine.registry().get("BTCUSDT").unwrap();
        assert_eq!(held.candidate.id, b.id);
        assert_eq!(held.installed_by, Action::Replace);
        assert_eq!(engine.registry().len(), 1);
    }

    #[test]
    fn test_weak_reversal_ignored() {
        let engine = engine();
        engine.decide(&candidate("BTCUSDT", Direction::Long, dec!(0.80), dec!(85)));
        let decision = engine.decide(&candidate("BTCUSDT", Direction::Short, dec!(0.90), dec!(95)));

        assert_eq!(decision.action, Action::Ignore);
        assert!(decision.reasoning.contains("confidence gap 0.10"));
        assert_eq!(
            engine.registry().get("BTCUSDT").unwrap().candidate.direction,
            Direction::Long
        );
    }

    #[test]
    fn test_reversal_below_quality_minimum_ignored() {
        let engine = engine();
        engine.decide(&candidate("BTCUSDT", Direction::Long, dec!(0.70), dec!(85)));
        let decision = engine.decide(&candidate("BTCUSDT", Direction::Short, dec!(0.95), dec!(60)));
        assert_eq!(decision.action, Action::Ignore);
    }

    #[test]
    fn test_enhance_overwrites_incumbent() {
        let engine = engine();
        let a = candidate("BTCUSDT", Direction::Long, dec!(0.70), dec!(75));
        let b = candidate("BTCUSDT", Direction::Long, dec!(0.80), dec!(82));

        engine.decide(&a);
        let decision = engine.decide(&b);
        assert_eq!(decision.action, Action::Enhance);
        assert_eq!(decision.execution_params.enhancement_ratio, Some(dec!(0.20)));
        assert_eq!(decision.related_signal_id, Some(a.id));
        assert_eq!(engine.registry().get("BTCUSDT").unwrap().candidate.id, b.id);
    }

    #[test]
    fn test_enhancement_ratio_capped() {
        let engine = engine();
        engine.decide(&candidate("BTCUSDT", Direction::Long, dec!(0.50), dec!(70)));
        let decision = engine.decide(&candidate("BTCUSDT", Direction::Long, dec!(0.90), dec!(90)));
        assert_eq!(decision.action, Action::Enhance);
        assert_eq!(decision.execution_params.enhancement_ratio, Some(dec!(0.5)));
    }

    #[test]
    fn test_enhance_requires_quality_gap_strictly_above() {
        let engine = engine();
        engine.decide(&candidate("BTCUSDT", Direction::Long, dec!(0.70), dec!(75)));
        let decision = engine.decide(&candidate("BTCUSDT", Direction::Long, dec!(0.90), dec!(80)));
        assert_eq!(decision.action, Action::Ignore);
        assert!(decision.reasoning.contains("quality gap 5"));
    }

    #[test]
    fn test_cap_limits_new_orders() {
        let config = ArbitrationConfig {
            max_active_positions: 2,
            ..Default::default()
        };
        let engine = ArbitrationEngine::new(config, PriorityThresholds::default());

        for symbol in ["AAA", "BBB"] {
            let d = engine.decide(&candidate(symbol, Direction::Long, dec!(0.8), dec!(85)));
            assert_eq!(d.action, Action::NewOrder);
        }
        let d = engine.decide(&candidate("CCC", Direction::Long, dec!(0.8), dec!(85)));
        assert_eq!(d.action, Action::Ignore);
        assert!(d.reasoning.contains("cap reached (2/2)"));
        assert!(!engine.registry().contains("CCC"));

        engine.registry().release("AAA");
        let d = engine.decide(&candidate("CCC", Direction::Long, dec!(0.8), dec!(85)));
        assert_eq!(d.action, Action::NewOrder);
    }

    #[test]
    fn test_cap_is_not_exceeded_concurrently() {
        let config = ArbitrationConfig {
            max_active_positions: 3,
            ..Default::default()
        };
        let engine = Arc::new(ArbitrationEngine::new(config, PriorityThresholds::default()));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let c = candidate(&format!("SYM{i}"), Direction::Long, dec!(0.8), dec!(85));
                    engine.decide(&c).action
                })
            })
            .collect();

        let new_orders = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|a| *a == Action::NewOrder)
            .count();
        assert_eq!(new_orders, 3);
        assert_eq!(engine.registry().len(), 3);
    }

    #[test]
    fn test_mismatched_entry_degrades_to_ignore() {
        let engine = engine();
        let stray = candidate("ETHUSDT", Direction::Long, dec!(0.8), dec!(85));
        engine.registry().positions.insert(
            "BTCUSDT".to_string(),
            ActivePosition::new(stray, Utc::now(), Action::NewOrder),
        );

        let decision = engine.decide(&candidate("BTCUSDT", Direction::Short, dec!(0.99), dec!(99)));
        assert_eq!(decision.action, Action::Ignore);
        assert!(decision.reasoning.starts_with("internal state error"));
    }
}
