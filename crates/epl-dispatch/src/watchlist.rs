//! HIGH-tier focus watch-list.

use chrono::{DateTime, Duration, Utc};
use epl_core::{CandidateId, Decision, Direction};
use epl_telemetry::Metrics;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Symbol under heightened attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusEntry {
    pub symbol: String,
    pub candidate_id: CandidateId,
    pub direction: Direction,
    pub quality_score: Decimal,
    pub added_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One entry per symbol; re-adding refreshes it.
#[derive(Debug)]
pub struct FocusWatchList {
    ttl: Duration,
    entries: Mutex<HashMap<String, FocusEntry>>,
}

impl FocusWatchList {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn add(&self, decision: &Decision, quality_score: Decimal, now: DateTime<Utc>) {
        let entry = FocusEntry {
            symbol: decision.symbol.clone(),
            candidate_id: decision.candidate_id.clone(),
            direction: decision.direction,
            quality_score,
            added_at: now,
            expires_at: now + self.ttl,
        };
        let size = {
            let mut entries = self.entries.lock();
            entries.insert(entry.symbol.clone(), entry);
            entries.len()
        };
        Metrics::focus_watchlist_size(size);
        debug!(symbol = %decision.symbol, candidate_id = %decision.candidate_id, "Added to focus watch-list");
    }

    /// Live entries at `now`, most recent first.
    pub fn list(&self, now: DateTime<Utc>) -> Vec<FocusEntry> {
        let mut live: Vec<FocusEntry> = self
            .entries
            .lock()
            .values()
            .filter(|e| e.expires_at > now)
            .cloned()
            .collect();
        live.sort_by(|a, b| b.added_at.cmp(&a.added_at).then_with(|| a.symbol.cmp(&b.symbol)));
        live
    }

    pub fn contains(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .lock()
            .get(symbol)
            .is_some_and(|e| e.expires_at > now)
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let (removed, size) = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|_, e| e.expires_at > now);
            (before - entries.len(), entries.len())
        };
        Metrics::focus_watchlist_size(size);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epl_core::{Action, ExecutionParams, Priority};
    use rust_decimal_macros::dec;

    fn decision(symbol: &str) -> Decision {
        Decision {
            candidate_id: CandidateId::new(),
            symbol: symbol.to_string(),
            direction: Direction::Long,
            action: Action::NewOrder,
            priority: Priority::High,
            reasoning: String::new(),
            confidence_delta: dec!(0.8),
            related_signal_id: None,
            execution_params: ExecutionParams::default(),
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let list = FocusWatchList::new(Duration::hours(1));
        let now = Utc::now();
        list.add(&decision("BTCUSDT"), dec!(85), now);

        assert!(list.contains("BTCUSDT", now + Duration::minutes(59)));
        assert!(!list.contains("BTCUSDT", now + Duration::hours(1)));
        assert_eq!(list.list(now + Duration::hours(2)).len(), 0);

        assert_eq!(list.prune(now + Duration::hours(2)), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_readd_refreshes_entry() {
        let list = FocusWatchList::new(Duration::hours(1));
        let now = Utc::now();
        list.add(&decision("BTCUSDT"), dec!(82), now);
        list.add(&decision("BTCUSDT"), dec!(88), now + Duration::minutes(30));

        assert_eq!(list.len(), 1);
        let live = list.list(now + Duration::minutes(80));
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].quality_score, dec!(88));
    }
}
