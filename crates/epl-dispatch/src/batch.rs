//! MEDIUM-tier batching.
//!
//! Collects MEDIUM decisions over a trailing window. Once the window holds
//! `threshold` entries a summary is produced and the window is cleared, so
//! each decision appears in at most one summary.

use chrono::{DateTime, Duration, Utc};
use epl_core::{Action, CandidateId, Decision, Direction};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;

/// One MEDIUM decision in the batch window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub candidate_id: CandidateId,
    pub symbol: String,
    pub direction: Direction,
    pub action: Action,
    pub confidence_delta: Decimal,
    pub decided_at: DateTime<Utc>,
}

impl From<&Decision> for BatchEntry {
    fn from(decision: &Decision) -> Self {
        Self {
            candidate_id: decision.candidate_id.clone(),
            symbol: decision.symbol.clone(),
            direction: decision.direction,
            action: decision.action,
            confidence_delta: decision.confidence_delta,
            decided_at: decision.decided_at,
        }
    }
}

/// Summary of a full batch window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct symbols in the batch, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.entries.iter().map(|e| e.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// One line per entry.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{} {} {} {} (Δconf {})",
                    e.decided_at.format("%H:%M:%S"),
                    e.action,
                    e.symbol,
                    e.direction,
                    e.confidence_delta
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug)]
pub struct MediumBatchWindow {
    threshold: usize,
    window: Duration,
    entries: VecDeque<BatchEntry>,
}

impl MediumBatchWindow {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold,
            window,
            entries: VecDeque::new(),
        }
    }

    /// Add an entry; returns a summary when the threshold is reached.
    ///
    /// Entries may arrive out of `decided_at` order; the window trails the
    /// newest one seen.
    pub fn push(&mut self, entry: BatchEntry) -> Option<BatchSummary> {
        self.entries.push_back(entry);
        let newest = self.entries.iter().map(|e| e.decided_at).max();
        if let Some(cutoff) = newest.and_then(|n| n.checked_sub_signed(self.window)) {
            self.entries.retain(|e| e.decided_at >= cutoff);
        }

        if self.entries.len() < self.threshold {
            return None;
        }

        let entries: Vec<BatchEntry> = self.entries.drain(..).collect();
        let window_start = entries
            .iter()
            .map(|e| e.decided_at)
            .min()
            .unwrap_or_else(Utc::now);
        let window_end = entries
            .iter()
            .map(|e| e.decided_at)
            .max()
            .unwrap_or(window_start);
        Some(BatchSummary {
            window_start,
            window_end,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(symbol: &str, at: DateTime<Utc>) -> BatchEntry {
        BatchEntry {
            candidate_id: CandidateId::new(),
            symbol: symbol.to_string(),
            direction: Direction::Long,
            action: Action::NewOrder,
            confidence_delta: dec!(0.72),
            decided_at: at,
        }
    }

    #[test]
    fn test_summary_at_threshold_then_cleared() {
        let mut window = MediumBatchWindow::new(5, Duration::hours(1));
        let t0 = Utc::now();

        for i in 0..4 {
            assert!(window.push(entry("BTCUSDT", t0 + Duration::minutes(i))).is_none());
        }
        let summary = window.push(entry("ETHUSDT", t0 + Duration::minutes(4))).unwrap();
        assert_eq!(summary.len(), 5);
        assert_eq!(summary.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(summary.window_start, t0);
        assert!(window.is_empty());

        assert!(window.push(entry("BTCUSDT", t0 + Duration::minutes(5))).is_none());
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_stale_entries_fall_out_of_window() {
        let mut window = MediumBatchWindow::new(5, Duration::hours(1));
        let t0 = Utc::now();

        for i in 0..4 {
            window.push(entry("BTCUSDT", t0 + Duration::minutes(i)));
        }
        // 2h later only the new entry counts
        assert!(window.push(entry("BTCUSDT", t0 + Duration::hours(2))).is_none());
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_out_of_order_stale_entry_dropped() {
        let mut window = MediumBatchWindow::new(5, Duration::hours(1));
        let t0 = Utc::now();

        assert!(window.push(entry("BTCUSDT", t0 + Duration::hours(2))).is_none());
        // Behind the front entry but outside the trailing hour
        assert!(window.push(entry("ETHUSDT", t0)).is_none());
        assert!(window.push(entry("SOLUSDT", t0 + Duration::minutes(30))).is_none());
        assert_eq!(window.len(), 1);

        for i in 1..=3 {
            assert!(window
                .push(entry("ETHUSDT", t0 + Duration::hours(2) - Duration::minutes(i)))
                .is_none());
        }
        assert_eq!(window.len(), 4);
        let summary = window
            .push(entry("BTCUSDT", t0 + Duration::minutes(90)))
            .unwrap();
        assert_eq!(summary.len(), 5);
        assert_eq!(summary.window_start, t0 + Duration::minutes(90));
        assert_eq!(summary.window_end, t0 + Duration::hours(2));
    }

    #[test]
    fn test_stale_entry_in_middle_is_trimmed() {
        let mut window = MediumBatchWindow::new(5, Duration::hours(1));
        let t0 = Utc::now();

        window.push(entry("BTCUSDT", t0 + Duration::minutes(50)));
        window.push(entry("ETHUSDT", t0));
        window.push(entry("SOLUSDT", t0 + Duration::minutes(55)));
        assert_eq!(window.len(), 3);

        // Newest moves to t0+70m: the t0 entry falls out even though it is not at the front
        window.push(entry("BTCUSDT", t0 + Duration::minutes(70)));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_render_one_line_per_entry() {
        let mut window = MediumBatchWindow::new(2, Duration::hours(1));
        let t0 = Utc::now();
        window.push(entry("BTCUSDT", t0));
        let summary = window.push(entry("ETHUSDT", t0)).unwrap();
        let text = summary.render();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("NEW_ORDER ETHUSDT LONG"));
    }
}
