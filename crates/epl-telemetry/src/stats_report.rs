//! Periodic decision statistics summary.
//!
//! Reads the process-wide Prometheus collectors and logs:
//! - candidate admission counts (admitted / duplicate / invalid)
//! - decision distribution by action and by priority
//! - channel delivery success rate
//! - immediate dissemination latency per tier (P50/P95/P99)

use crate::metrics::{
    CANDIDATES_TOTAL, CHANNEL_DELIVERIES_TOTAL, DECISIONS_TOTAL, DISPATCH_LATENCY_MS,
};
use chrono::{DateTime, Utc};
use epl_core::{Action, ChannelKind, Priority};
use prometheus::core::Collector;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Latency percentiles for one dissemination tier.
#[derive(Debug, Clone, Serialize)]
pub struct TierLatency {
    pub tier: String,
    pub samples: u64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Snapshot of the collectors, suitable for logging or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionStatsSummary {
    pub since: DateTime<Utc>,
    pub admitted: u64,
    pub duplicates: u64,
    pub invalid: u64,
    pub by_action: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
    pub deliveries_ok: u64,
    pub deliveries_failed: u64,
    pub tier_latency: Vec<TierLatency>,
}

impl DecisionStatsSummary {
    /// Fraction of seen candidates filtered as duplicates.
    pub fn duplicate_rate(&self) -> f64 {
        let seen = self.admitted + self.duplicates + self.invalid;
        if seen == 0 {
            0.0
        } else {
            self.duplicates as f64 / seen as f64
        }
    }

    /// Fraction of delivery attempts that succeeded.
    pub fn delivery_success_rate(&self) -> f64 {
        let total = self.deliveries_ok + self.deliveries_failed;
        if total == 0 {
            1.0
        } else {
            self.deliveries_ok as f64 / total as f64
        }
    }
}

/// Decision statistics reporter.
pub struct DecisionStatsReporter {
    start_time: DateTime<Utc>,
}

impl DecisionStatsReporter {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
        }
    }

    /// Collect current statistics.
    pub fn summary(&self) -> DecisionStatsSummary {
        let admitted = counter_value(&CANDIDATES_TOTAL, &["admitted"]);
        let duplicates = counter_value(&CANDIDATES_TOTAL, &["duplicate"]);
        let invalid = counter_value(&CANDIDATES_TOTAL, &["invalid"]);

        let mut by_action = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for action in Action::ALL {
            for priority in Priority::ALL {
                let n = counter_value(&DECISIONS_TOTAL, &[action.as_str(), priority.as_str()]);
                *by_action.entry(action.as_str().to_string()).or_insert(0) += n;
                *by_priority.entry(priority.as_str().to_string()).or_insert(0) += n;
            }
        }

        let mut deliveries_ok = 0;
        let mut deliveries_failed = 0;
        for channel in ChannelKind::ALL {
            deliveries_ok += counter_value(&CHANNEL_DELIVERIES_TOTAL, &[channel.as_str(), "delivered"]);
            deliveries_failed +=
                counter_value(&CHANNEL_DELIVERIES_TOTAL, &[channel.as_str(), "failed"]);
        }

        let tier_latency = Priority::ALL
            .iter()
            .map(|p| histogram_percentiles(&DISPATCH_LATENCY_MS, p.as_str()))
            .collect();

        DecisionStatsSummary {
            since: self.start_time,
            admitted,
            duplicates,
            invalid,
            by_action,
            by_priority,
            deliveries_ok,
            deliveries_failed,
            tier_latency,
        }
    }

    /// Output statistics to logs.
    pub fn output_summary(&self) {
        let s = self.summary();
        let duration = Utc::now() - self.start_time;
        let hours = duration.num_hours();
        let minutes = duration.num_minutes() % 60;

        info!("========== Decision Statistics Summary ==========");
        info!(
            "Period: {} ({} hours {} minutes)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            hours,
            minutes
        );
        info!(
            "  Candidates: admitted={}, duplicates={}, invalid={} (dup rate {:.2}%)",
            s.admitted,
            s.duplicates,
            s.invalid,
            s.duplicate_rate() * 100.0
        );
        for (action, n) in &s.by_action {
            info!("  Action {}: {}", action, n);
        }
        for (priority, n) in &s.by_priority {
            info!("  Priority {}: {}", priority, n);
        }
        info!(
            "  Deliveries: ok={}, failed={} (success {:.2}%)",
            s.deliveries_ok,
            s.deliveries_failed,
            s.delivery_success_rate() * 100.0
        );
        for t in &s.tier_latency {
            if t.samples > 0 {
                info!(
                    "  Dispatch {} (ms): P50={:.2}, P95={:.2}, P99={:.2} (n={})",
                    t.tier, t.p50_ms, t.p95_ms, t.p99_ms, t.samples
                );
            }
        }
        info!("=================================================");
    }
}

impl Default for DecisionStatsReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn counter_value(counter: &prometheus::CounterVec, labels: &[&str]) -> u64 {
    counter.with_label_values(labels).get() as u64
}

/// Percentiles for one tier label of a histogram.
fn histogram_percentiles(histogram: &prometheus::HistogramVec, tier: &str) -> TierLatency {
    let empty = TierLatency {
        tier: tier.to_string(),
        samples: 0,
        p50_ms: 0.0,
        p95_ms: 0.0,
        p99_ms: 0.0,
    };

    for mf in histogram.collect() {
        for m in mf.get_metric() {
            let labels = m.get_label();
            if labels.len() != 1 || labels[0].get_value() != tier {
                continue;
            }

            let h = m.get_histogram();
            let count = h.get_sample_count();
            if count == 0 {
                return empty;
            }

            let buckets = h.get_bucket();
            return TierLatency {
                tier: tier.to_string(),
                samples: count,
                p50_ms: percentile_from_buckets(buckets, count, 0.50),
                p95_ms: percentile_from_buckets(buckets, count, 0.95),
                p99_ms: percentile_from_buckets(buckets, count, 0.99),
            };
        }
    }
    empty
}

/// Percentile by linear interpolation within cumulative buckets.
fn percentile_from_buckets(
    buckets: &[prometheus::proto::Bucket],
    total_count: u64,
    percentile: f64,
) -> f64 {
    let target = (total_count as f64 * percentile).ceil() as u64;
    let mut prev_bound = 0.0;
    let mut prev_count = 0u64;

    for bucket in buckets {
        let upper_bound = bucket.get_upper_bound();
        let cumulative_count = bucket.get_cumulative_count();

        if cumulative_count >= target {
            let bucket_count = cumulative_count - prev_count;
            if bucket_count == 0 {
                return upper_bound;
            }
            let position = (target - prev_count) as f64 / bucket_count as f64;
            return prev_bound + position * (upper_bound - prev_bound);
        }

        prev_bound = upper_bound;
        prev_count = cumulative_count;
    }

    buckets.last().map(|b| b.get_upper_bound()).unwrap_or(0.0)
}
