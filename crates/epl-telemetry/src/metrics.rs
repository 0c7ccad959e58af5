//! Prometheus metrics for the EPL engine.
//!
//! Covers:
//! - Candidate admission (admitted / duplicate / invalid)
//! - Arbitration outcomes by action and priority
//! - Active-position registry size and evictions
//! - Channel delivery results and dissemination latency per tier
//! - Scheduled (delayed / batched) dissemination work
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which must crash at startup rather than fail
//! silently. These panics only occur during lazy static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, HistogramVec, IntCounter, IntGauge,
};

/// Candidates seen by outcome.
/// Labels: outcome (admitted/duplicate/invalid)
pub static CANDIDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "epl_candidates_total",
        "Total signal candidates seen by admission outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Duplicates filtered by matching rule.
/// Labels: symbol, rule (confidence/indicators)
pub static DUPLICATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "epl_duplicates_total",
        "Total near-duplicate candidates filtered",
        &["symbol", "rule"]
    )
    .unwrap()
});

/// Decisions by action and priority.
pub static DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "epl_decisions_total",
        "Total arbitration decisions",
        &["action", "priority"]
    )
    .unwrap()
});

/// Arbitration fell back to IGNORE because registry state was inconsistent.
pub static INTERNAL_STATE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "epl_internal_state_errors_total",
        "Arbitration branches degraded to IGNORE on inconsistent registry state"
    )
    .unwrap()
});

/// Current number of active positions.
pub static ACTIVE_POSITIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "epl_active_positions",
        "Current number of active positions in the registry"
    )
    .unwrap()
});

/// Registry evictions.
/// Labels: reason (expired/released)
pub static REGISTRY_EVICTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "epl_registry_evictions_total",
        "Total active-position registry evictions",
        &["reason"]
    )
    .unwrap()
});

/// Channel deliveries.
/// Labels: channel, status (delivered/rejected/failed/expired/cancelled)
pub static CHANNEL_DELIVERIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "epl_channel_deliveries_total",
        "Total notification delivery attempts by channel and status",
        &["channel", "status"]
    )
    .unwrap()
});

/// Time spent in the immediate part of dissemination.
pub static DISPATCH_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "epl_dispatch_latency_ms",
        "Immediate dissemination latency in milliseconds by tier",
        &["tier"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// End-to-end candidate processing latency.
pub static PROCESS_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "epl_process_latency_ms",
        "Candidate processing latency in milliseconds by action",
        &["action"],
        vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 1000.0]
    )
    .unwrap()
});

/// Scheduled dissemination tasks not yet finished.
pub static SCHEDULED_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "epl_scheduled_pending",
        "Scheduled dissemination tasks pending"
    )
    .unwrap()
});

/// MEDIUM-tier batch summaries emitted.
pub static BATCH_SUMMARIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "epl_batch_summaries_total",
        "Total MEDIUM-tier batch summaries emitted"
    )
    .unwrap()
});

/// Risk assessments triggered by CRITICAL decisions.
/// Labels: level (elevated/severe)
pub static RISK_ASSESSMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "epl_risk_assessments_total",
        "Total risk assessments triggered by CRITICAL decisions",
        &["level"]
    )
    .unwrap()
});

/// Focus watch-list size.
pub static FOCUS_WATCHLIST_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "epl_focus_watchlist_size",
        "Symbols currently on the HIGH-tier focus watch-list"
    )
    .unwrap()
});

/// Metrics helper for convenient recording.
pub struct Metrics;

impl Metrics {
    // =========================================================================
    // Admission
    // =========================================================================

    pub fn candidate_admitted() {
        CANDIDATES_TOTAL.with_label_values(&["admitted"]).inc();
    }

    /// Record a duplicate drop.
    pub fn candidate_duplicate(symbol: &str, rule: &str) {
        CANDIDATES_TOTAL.with_label_values(&["duplicate"]).inc();
        DUPLICATES_TOTAL.with_label_values(&[symbol, rule]).inc();
    }

    pub fn candidate_invalid() {
        CANDIDATES_TOTAL.with_label_values(&["invalid"]).inc();
    }

    // =========================================================================
    // Arbitration
    // =========================================================================

    /// Record an arbitration outcome.
    pub fn decision(action: &str, priority: &str) {
        DECISIONS_TOTAL
            .with_label_values(&[action, priority])
            .inc();
    }

    pub fn internal_state_error() {
        INTERNAL_STATE_ERRORS_TOTAL.inc();
    }

    /// Update the active-position gauge.
    pub fn active_positions(count: usize) {
        ACTIVE_POSITIONS.set(count as i64);
    }

    /// Record registry evictions.
    pub fn registry_evicted(reason: &str, count: usize) {
        REGISTRY_EVICTIONS_TOTAL
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }

    /// Record end-to-end processing latency.
    pub fn process_latency(action: &str, latency_ms: f64) {
        PROCESS_LATENCY_MS
            .with_label_values(&[action])
            .observe(latency_ms);
    }

    // =========================================================================
    // Dissemination
    // =========================================================================

    /// Record a channel delivery attempt.
    pub fn channel_delivery(channel: &str, status: &str) {
        CHANNEL_DELIVERIES_TOTAL
            .with_label_values(&[channel, status])
            .inc();
    }

    /// Record immediate dissemination latency.
    pub fn dispatch_latency(tier: &str, latency_ms: f64) {
        DISPATCH_LATENCY_MS
            .with_label_values(&[tier])
            .observe(latency_ms);
    }

    pub fn scheduled_inc() {
        SCHEDULED_PENDING.inc();
    }

    pub fn scheduled_dec() {
        SCHEDULED_PENDING.dec();
    }

    pub fn batch_summary() {
        BATCH_SUMMARIES_TOTAL.inc();
    }

    /// Record a risk assessment.
    pub fn risk_assessment(level: &str) {
        RISK_ASSESSMENTS_TOTAL.with_label_values(&[level]).inc();
    }

    pub fn focus_watchlist_size(size: usize) {
        FOCUS_WATCHLIST_SIZE.set(size as i64);
    }
}
