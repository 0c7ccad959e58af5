//! Tiered dissemination router.
//!
//! | Tier     | Immediate                         | Deferred / side effects              |
//! |----------|-----------------------------------|--------------------------------------|
//! | CRITICAL | every channel, concurrently       | risk assessment side task            |
//! | HIGH     | push                              | email after delay, focus watch-list  |
//! | MEDIUM   | display channel + display history | batch summary (email) at threshold   |
//! | LOW      | display history                   | research capture                     |
//!
//! IGNORE decisions always take the LOW path. Delivery failures are reported
//! in the `DispatchReport` and never touch the decision.

use crate::batch::{BatchEntry, BatchSummary, MediumBatchWindow};
use crate::buffer::RingBuffer;
use crate::channel::{deliver, ChannelDelivery, ChannelSet};
use crate::config::DispatchConfig;
use crate::risk::RiskAssessment;
use crate::scheduler::DispatchScheduler;
use crate::watchlist::{FocusEntry, FocusWatchList};
use chrono::{DateTime, Utc};
use epl_core::{
    Action, ChannelKind, Decision, Direction, NotificationMessage, Priority, SignalCandidate,
};
use epl_telemetry::Metrics;
use futures_util::future::join_all;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Which path a decision was routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPath {
    Critical,
    High,
    Medium,
    Passive,
}

impl DispatchPath {
    /// Tier label used for latency metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Passive => "low",
        }
    }
}

/// What one dispatch did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub path: DispatchPath,
    /// Immediate delivery attempts.
    pub deliveries: Vec<ChannelDelivery>,
    /// Delayed sends handed to the scheduler.
    pub scheduled: usize,
    /// Background side tasks spawned.
    pub side_tasks: usize,
    /// A MEDIUM batch summary was emitted.
    pub batch_emitted: bool,
}

impl DispatchReport {
    fn new(path: DispatchPath) -> Self {
        Self {
            path,
            deliveries: Vec::new(),
            scheduled: 0,
            side_tasks: 0,
            batch_emitted: false,
        }
    }

    /// Channels attempted immediately.
    pub fn attempted(&self) -> Vec<ChannelKind> {
        self.deliveries.iter().map(|d| d.channel).collect()
    }

    pub fn failures(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| !d.status.is_success())
            .count()
    }
}

/// Display board entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayEntry {
    pub symbol: String,
    pub direction: Direction,
    pub action: Action,
    pub priority: Priority,
    pub quality_score: Decimal,
    pub confidence: Decimal,
    pub reasoning: String,
    pub displayed_at: DateTime<Utc>,
}

/// Candidate and decision kept for offline research and training.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchRecord {
    pub candidate: SignalCandidate,
    pub decision: Decision,
    pub captured_at: DateTime<Utc>,
}

pub struct TieredRouter {
    config: DispatchConfig,
    channels: ChannelSet,
    scheduler: Arc<DispatchScheduler>,
    watchlist: FocusWatchList,
    batch: Mutex<MediumBatchWindow>,
    display: Mutex<RingBuffer<DisplayEntry>>,
    research: Mutex<RingBuffer<ResearchRecord>>,
}

impl TieredRouter {
    pub fn new(config: DispatchConfig, channels: ChannelSet) -> Self {
        let scheduler = Arc::new(DispatchScheduler::new(config.send_timeout()));
        Self {
            watchlist: FocusWatchList::new(config.focus_ttl()),
            batch: Mutex::new(MediumBatchWindow::new(
                config.batch_threshold,
                config.batch_window(),
            )),
            display: Mutex::new(RingBuffer::new(config.display_history_cap)),
            research: Mutex::new(RingBuffer::new(config.research_capture_cap)),
            scheduler,
            channels,
            config,
        }
    }

    /// Route `decision` by tier.
    ///
    /// Returns once the immediate part is done; delayed sends and side tasks
    /// keep running on the scheduler.
    pub async fn dispatch(&self, candidate: &SignalCandidate, decision: &Decision) -> DispatchReport {
        let start = Instant::now();

        let path = if decision.action == Action::Ignore {
            DispatchPath::Passive
        } else {
            match decision.priority {
                Priority::Critical => DispatchPath::Critical,
                Priority::High => DispatchPath::High,
                Priority::Medium => DispatchPath::Medium,
                Priority::Low => DispatchPath::Passive,
            }
        };

        let report = match path {
            DispatchPath::Critical => self.dispatch_critical(candidate, decision).await,
            DispatchPath::High => self.dispatch_high(candidate, decision).await,
            DispatchPath::Medium => self.dispatch_medium(candidate, decision).await,
            DispatchPath::Passive => self.dispatch_passive(candidate, decision),
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        Metrics::dispatch_latency(path.as_str(), latency_ms);
        debug!(
            symbol = %decision.symbol,
            candidate_id = %decision.candidate_id,
            path = path.as_str(),
            attempted = report.deliveries.len(),
            failures = report.failures(),
            scheduled = report.scheduled,
            latency_ms = latency_ms,
            "Decision dispatched"
        );
        report
    }

    async fn dispatch_critical(
        &self,
        candidate: &SignalCandidate,
        decision: &Decision,
    ) -> DispatchReport {
        let mut report = DispatchReport::new(DispatchPath::Critical);
        let message = self.message(candidate, decision, self.channels.kinds());
        let timeout = self.config.send_timeout();

        let sends = self
            .channels
            .all()
            .map(|channel| deliver(channel.as_ref(), message.clone(), timeout));
        report.deliveries = join_all(sends).await;

        let candidate = candidate.clone();
        let decision = decision.clone();
        let severe_confidence = self.config.severe_confidence;
        if self.scheduler.spawn_side_task(async move {
            let assessment = RiskAssessment::assess(&candidate, &decision, severe_confidence);
            Metrics::risk_assessment(assessment.level.as_str());
            warn!(
                symbol = %assessment.symbol,
                candidate_id = %assessment.candidate_id,
                action = %assessment.action,
                level = %assessment.level,
                confidence = %assessment.confidence,
                size_fraction = ?assessment.size_fraction,
                reasons = ?assessment.reasons,
                "Risk assessment"
            );
        }) {
            report.side_tasks += 1;
        }
        report
    }

    async fn dispatch_high(&self, candidate: &SignalCandidate, decision: &Decision) -> DispatchReport {
        let mut report = DispatchReport::new(DispatchPath::High);
        let push = self.channels.get(ChannelKind::Push);
        let email = self.channels.get(ChannelKind::Email);

        let targets: Vec<ChannelKind> = [push, email]
            .into_iter()
            .flatten()
            .map(|c| c.kind())
            .collect();
        let message = self.message(candidate, decision, targets);

        if let Some(push) = push {
            report.deliveries.push(
                deliver(push.as_ref(), message.clone(), self.config.send_timeout()).await,
            );
        }
        if let Some(email) = email {
            if self.scheduler.schedule_after(
                self.config.high_email_delay(),
                Arc::clone(email),
                message,
            ) {
                report.scheduled += 1;
            }
        }

        self.watchlist
            .add(decision, candidate.quality_score, Utc::now());
        report
    }

    async fn dispatch_medium(
        &self,
        candidate: &SignalCandidate,
        decision: &Decision,
    ) -> DispatchReport {
        let mut report = DispatchReport::new(DispatchPath::Medium);

        if let Some(display) = self.channels.get(ChannelKind::Display) {
            let message = self.message(candidate, decision, vec![ChannelKind::Display]);
            report
                .deliveries
                .push(deliver(display.as_ref(), message, self.config.send_timeout()).await);
        }
        self.display_append(candidate, decision);

        let summary = self.batch.lock().push(BatchEntry::from(decision));
        if let Some(summary) = summary {
            report.batch_emitted = true;
            Metrics::batch_summary();
            info!(
                count = summary.len(),
                symbols = ?summary.symbols(),
                window_start = %summary.window_start,
                "MEDIUM batch summary"
            );
            if let Some(email) = self.channels.get(ChannelKind::Email) {
                let message = self.batch_message(&summary);
                if self
                    .scheduler
                    .schedule_after(std::time::Duration::ZERO, Arc::clone(email), message)
                {
                    report.scheduled += 1;
                }
            }
        }
        report
    }

    fn dispatch_passive(&self, candidate: &SignalCandidate, decision: &Decision) -> DispatchReport {
        self.display_append(candidate, decision);
        self.research.lock().push(ResearchRecord {
            candidate: candidate.clone(),
            decision: decision.clone(),
            captured_at: Utc::now(),
        });
        DispatchReport::new(DispatchPath::Passive)
    }

    fn display_append(&self, candidate: &SignalCandidate, decision: &Decision) {
        self.display.lock().push(DisplayEntry {
            symbol: decision.symbol.clone(),
            direction: decision.direction,
            action: decision.action,
            priority: decision.priority,
            quality_score: candidate.quality_score,
            confidence: candidate.confidence,
            reasoning: decision.reasoning.clone(),
            displayed_at: Utc::now(),
        });
    }

    fn message(
        &self,
        candidate: &SignalCandidate,
        decision: &Decision,
        channels: Vec<ChannelKind>,
    ) -> NotificationMessage {
        NotificationMessage::new(
            decision.priority,
            channels,
            format!(
                "[{}] {} {} {}",
                decision.priority, decision.action, decision.symbol, decision.direction
            ),
            format!(
                "confidence {} quality {}: {}",
                candidate.confidence, candidate.quality_score, decision.reasoning
            ),
            json!({
                "candidate_id": decision.candidate_id,
                "symbol": decision.symbol,
                "direction": decision.direction,
                "action": decision.action,
                "priority": decision.priority,
                "confidence": candidate.confidence,
                "quality_score": candidate.quality_score,
                "confidence_delta": decision.confidence_delta,
                "related_signal_id": decision.related_signal_id,
                "execution_params": decision.execution_params,
                "indicators": candidate.indicators,
            }),
            self.config.ttl(decision.priority),
        )
    }

    fn batch_message(&self, summary: &BatchSummary) -> NotificationMessage {
        NotificationMessage::new(
            Priority::Medium,
            vec![ChannelKind::Email],
            format!(
                "[MEDIUM] {} decisions across {} symbols",
                summary.len(),
                summary.symbols().len()
            ),
            summary.render(),
            json!({
                "window_start": summary.window_start,
                "window_end": summary.window_end,
                "entries": summary.entries,
            }),
            self.config.ttl(Priority::Medium),
        )
    }

    /// Most recent display entries, newest first.
    pub fn display_history(&self, n: usize) -> Vec<DisplayEntry> {
        self.display.lock().recent(n)
    }

    /// Most recent research records, newest first.
    pub fn research_records(&self, n: usize) -> Vec<ResearchRecord> {
        self.research.lock().recent(n)
    }

    /// Live focus watch-list entries.
    pub fn focus_list(&self) -> Vec<FocusEntry> {
        self.watchlist.list(Utc::now())
    }

    /// Drop expired focus entries. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        self.watchlist.prune(now)
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn scheduler(&self) -> &Arc<DispatchScheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Cancel scheduled work and wait for in-flight tasks.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
