//! Decision ledger: bounded decision history plus counters.
//!
//! Counters are fixed arrays indexed by `Action::index()` and
//! `Priority::index()`. History is trimmed to `trim_to` records once it
//! exceeds `capacity`, dropping the oldest.

use chrono::{DateTime, Utc};
use epl_core::{Action, Decision, Priority, SignalCandidate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Ledger sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_trim_to")]
    pub trim_to: usize,
}

fn default_capacity() -> usize {
    1000
}

fn default_trim_to() -> usize {
    500
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            trim_to: default_trim_to(),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("ledger capacity must be positive".to_string());
        }
        if self.trim_to >= self.capacity {
            return Err(format!(
                "ledger trim_to ({}) must be < capacity ({})",
                self.trim_to, self.capacity
            ));
        }
        Ok(())
    }
}

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub recorded_at: DateTime<Utc>,
    pub candidate: SignalCandidate,
    pub decision: Decision,
}

/// Read-only copy of the ledger counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_candidates: u64,
    pub duplicates_filtered: u64,
    pub validation_rejected: u64,
    pub decisions_processed: u64,
    /// Indexed by `Action::index()`.
    pub actions: [u64; 4],
    /// Indexed by `Priority::index()`.
    pub priorities: [u64; 4],
    pub history_len: usize,
    /// Time of construction or last reset.
    pub since: DateTime<Utc>,
}

impl Stats {
    pub fn action_count(&self, action: Action) -> u64 {
        self.actions[action.index()]
    }

    pub fn priority_count(&self, priority: Priority) -> u64 {
        self.priorities[priority.index()]
    }
}

#[derive(Debug)]
struct LedgerState {
    total_candidates: u64,
    duplicates_filtered: u64,
    validation_rejected: u64,
    decisions_processed: u64,
    actions: [u64; 4],
    priorities: [u64; 4],
    since: DateTime<Utc>,
    history: VecDeque<DecisionRecord>,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            total_candidates: 0,
            duplicates_filtered: 0,
            validation_rejected: 0,
            decisions_processed: 0,
            actions: [0; 4],
            priorities: [0; 4],
            since: Utc::now(),
            history: VecDeque::new(),
        }
    }
}

#[derive(Debug)]
pub struct DecisionLedger {
    config: LedgerConfig,
    state: Mutex<LedgerState>,
}

impl DecisionLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LedgerState::new()),
        }
    }

    /// Count an incoming candidate (before validation).
    pub fn candidate_seen(&self) {
        self.state.lock().total_candidates += 1;
    }

    pub fn duplicate_filtered(&self) {
        self.state.lock().duplicates_filtered += 1;
    }

    pub fn validation_rejected(&self) {
        self.state.lock().validation_rejected += 1;
    }

    /// Append a decision and bump its counters.
    pub fn record(&self, candidate: &SignalCandidate, decision: &Decision) {
        let mut state = self.state.lock();
        state.decisions_processed += 1;
        state.actions[decision.action.index()] += 1;
        state.priorities[decision.priority.index()] += 1;
        state.history.push_back(DecisionRecord {
            recorded_at: Utc::now(),
            candidate: candidate.clone(),
            decision: decision.clone(),
        });

        if state.history.len() > self.config.capacity {
            let excess = state.history.len() - self.config.trim_to;
            state.history.drain(..excess);
            debug!(
                dropped = excess,
                kept = state.history.len(),
                "Decision history trimmed"
            );
        }
    }

    pub fn snapshot(&self) -> Stats {
        let state = self.state.lock();
        Stats {
            total_candidates: state.total_candidates,
            duplicates_filtered: state.duplicates_filtered,
            validation_rejected: state.validation_rejected,
            decisions_processed: state.decisions_processed,
            actions: state.actions,
            priorities: state.priorities,
            history_len: state.history.len(),
            since: state.since,
        }
    }

    /// Zero the counters. History is kept.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.total_candidates = 0;
        state.duplicates_filtered = 0;
        state.validation_rejected = 0;
        state.decisions_processed = 0;
        state.actions = [0; 4];
        state.priorities = [0; 4];
        state.since = Utc::now();
    }

    /// Up to `n` most recent records, newest first.
    pub fn recent(&self, n: usize) -> Vec<DecisionRecord> {
        self.state
            .lock()
            .history
            .iter()
            .rev()
            .take(n)
            .cloned()
            .collect()
    }

    /// Records for `symbol`, oldest first.
    pub fn for_symbol(&self, symbol: &str) -> Vec<DecisionRecord> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|r| r.decision.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DecisionLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epl_core::{CandidateId, Direction, ExecutionParams};
    use rust_decimal_macros::dec;

    fn record_one(ledger: &DecisionLedger, symbol: &str, action: Action, priority: Priority) {
        let candidate = SignalCandidate::new(symbol, Direction::Long, dec!(0.8), dec!(85), ["rsi"]);
        let decision = Decision {
            candidate_id: candidate.id.clone(),
            symbol: symbol.to_string(),
            direction: Direction::Long,
            action,
            priority,
            reasoning: String::new(),
            confidence_delta: dec!(0.8),
            related_signal_id: None::<CandidateId>,
            execution_params: ExecutionParams::default(),
            decided_at: Utc::now(),
        };
        ledger.candidate_seen();
        ledger.record(&candidate, &decision);
    }

    #[test]
    fn test_counters_by_action_and_priority() {
        let ledger = DecisionLedger::default();
        record_one(&ledger, "BTCUSDT", Action::NewOrder, Priority::High);
        record_one(&ledger, "BTCUSDT", Action::Replace, Priority::Critical);
        record_one(&ledger, "ETHUSDT", Action::Ignore, Priority::Low);
        ledger.candidate_seen();
        ledger.duplicate_filtered();

        let stats = ledger.snapshot();
        assert_eq!(stats.total_candidates, 4);
        assert_eq!(stats.duplicates_filtered, 1);
        assert_eq!(stats.decisions_processed, 3);
        assert_eq!(stats.action_count(Action::Replace), 1);
        assert_eq!(stats.action_count(Action::Enhance), 0);
        assert_eq!(stats.priority_count(Priority::Critical), 1);
        assert_eq!(stats.priority_count(Priority::Low), 1);
        assert_eq!(stats.history_len, 3);
    }

    #[test]
    fn test_consecutive_snapshots_identical() {
        let ledger = DecisionLedger::default();
        record_one(&ledger, "BTCUSDT", Action::NewOrder, Priority::High);
        assert_eq!(ledger.snapshot(), ledger.snapshot());
    }

    #[test]
    fn test_reset_keeps_history() {
        let ledger = DecisionLedger::default();
        record_one(&ledger, "BTCUSDT", Action::NewOrder, Priority::High);
        let before = ledger.snapshot().since;

        ledger.reset();
        let stats = ledger.snapshot();
        assert_eq!(stats.decisions_processed, 0);
        assert_eq!(stats.actions, [0; 4]);
        assert_eq!(stats.history_len, 1);
        assert!(stats.since >= before);
    }

    #[test]
    fn test_history_trimmed_past_capacity() {
        let ledger = DecisionLedger::new(LedgerConfig {
            capacity: 10,
            trim_to: 5,
        });
        for i in 0..11 {
            record_one(&ledger, &format!("SYM{i}"), Action::Ignore, Priority::Low);
        }
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.recent(1)[0].decision.symbol, "SYM10");
        assert!(ledger.for_symbol("SYM5").is_empty());
        assert_eq!(ledger.for_symbol("SYM6").len(), 1);
        // counters are not trimmed
        assert_eq!(ledger.snapshot().decisions_processed, 11);
    }

    #[test]
    fn test_trim_must_be_below_capacity() {
        let config = LedgerConfig {
            capacity: 10,
            trim_to: 10,
        };
        assert!(config.validate().is_err());
    }
}
