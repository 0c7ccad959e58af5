//! Active-position registry.
//!
//! Holds at most one accepted candidate per symbol. Only arbitration
//! installs entries (through the `DashMap` entry API so check-then-act on a
//! symbol is atomic); the maintenance sweep and operator release remove them.
//!
//! The number of occupied slots is tracked in a separate atomic so the global
//! concurrency cap can be reserved without calling `DashMap::len` while a
//! shard lock is held.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use epl_core::{Action, SignalCandidate};
use epl_telemetry::Metrics;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Registry entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivePosition {
    pub candidate: SignalCandidate,
    /// Wall clock at acceptance; retention is measured from here.
    pub accepted_at: DateTime<Utc>,
    /// Action that installed this entry.
    pub installed_by: Action,
}

impl ActivePosition {
    pub fn new(candidate: SignalCandidate, accepted_at: DateTime<Utc>, installed_by: Action) -> Self {
        Self {
            candidate,
            accepted_at,
            installed_by,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.candidate.symbol
    }

    /// Whether the entry is past `retention` at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        now - self.accepted_at >= retention
    }
}

/// Symbol → accepted candidate.
#[derive(Debug)]
pub struct ActivePositionRegistry {
    pub(crate) positions: DashMap<String, ActivePosition>,
    active: AtomicUsize,
    retention: Duration,
}

impl ActivePositionRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            positions: DashMap::new(),
            active: AtomicUsize::new(0),
            retention,
        }
    }

    /// Current entry for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<ActivePosition> {
        self.positions.get(symbol).map(|r| r.value().clone())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Copy of all entries, ordered by symbol.
    pub fn snapshot(&self) -> Vec<ActivePosition> {
        let mut entries: Vec<ActivePosition> =
            self.positions.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        entries
    }

    /// Remove the entry for `symbol` (operator release).
    pub fn release(&self, symbol: &str) -> Option<ActivePosition> {
        let removed = self.positions.remove(symbol).map(|(_, p)| p);
        if let Some(position) = &removed {
            self.release_slots(1);
            Metrics::registry_evicted("released", 1);
            Metrics::active_positions(self.len());
            info!(
                symbol = %symbol,
                candidate_id = %position.candidate.id,
                "Active position released"
            );
        }
        removed
    }

    /// Evict entries accepted more than `retention` before `now`.
    ///
    /// Returns the number of evicted entries.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let retention = self.retention;
        let mut evicted = 0usize;
        self.positions.retain(|symbol, position| {
            let expired = position.is_expired_at(now, retention);
            if expired {
                evicted += 1;
                debug!(
                    symbol = %symbol,
                    candidate_id = %position.candidate.id,
                    accepted_at = %position.accepted_at,
                    "Active position expired"
                );
            }
            !expired
        });

        if evicted > 0 {
            self.release_slots(evicted);
            Metrics::registry_evicted("expired", evicted);
            Metrics::active_positions(self.len());
        }
        evicted
    }

    /// Reserve one slot under `cap`. Returns false when the cap is reached.
    pub(crate) fn try_reserve(&self, cap: usize) -> bool {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < cap).then_some(n + 1)
            })
            .is_ok()
    }

    /// Return `count` slots.
    pub(crate) fn release_slots(&self, count: usize) {
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(count))
            });
    }
}

impl Default for ActivePositionRegistry {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epl_core::Direction;
    use rust_decimal_macros::dec;

    fn install(registry: &ActivePositionRegistry, symbol: &str, accepted_at: DateTime<Utc>) {
        assert!(registry.try_reserve(10));
        let candidate =
            SignalCandidate::new(symbol, Direction::Long, dec!(0.8), dec!(85), ["rsi"]);
        registry.positions.insert(
            symbol.to_string(),
            ActivePosition::new(candidate, accepted_at, Action::NewOrder),
        );
    }

    #[test]
    fn test_reserve_respects_cap() {
        let registry = ActivePositionRegistry::default();
        assert!(registry.try_reserve(2));
        assert!(registry.try_reserve(2));
        assert!(!registry.try_reserve(2));
        assert_eq!(registry.len(), 2);

        registry.release_slots(1);
        assert!(registry.try_reserve(2));
    }

    #[test]
    fn test_release_slots_saturates() {
        let registry = ActivePositionRegistry::default();
        registry.release_slots(3);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_release_removes_entry() {
        let registry = ActivePositionRegistry::default();
        install(&registry, "BTCUSDT", Utc::now());

        let released = registry.release("BTCUSDT").unwrap();
        assert_eq!(released.symbol(), "BTCUSDT");
        assert!(registry.is_empty());
        assert!(registry.release("BTCUSDT").is_none());
    }

    #[test]
    fn test_sweep_evicts_only_expired() {
        let registry = ActivePositionRegistry::new(Duration::hours(24));
        let now = Utc::now();
        install(&registry, "BTCUSDT", now - Duration::hours(25));
        install(&registry, "ETHUSDT", now - Duration::hours(1));

        assert_eq!(registry.sweep_expired(now), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("ETHUSDT"));
        assert!(!registry.contains("BTCUSDT"));
    }

    #[test]
    fn test_snapshot_sorted_by_symbol() {
        let registry = ActivePositionRegistry::default();
        install(&registry, "SOLUSDT", Utc::now());
        install(&registry, "BTCUSDT", Utc::now());

        let symbols: Vec<_> = registry
            .snapshot()
            .iter()
            .map(|p| p.symbol().to_string())
            .collect();
        assert_eq!(symbols, vec!["BTCUSDT", "SOLUSDT"]);
    }
}
