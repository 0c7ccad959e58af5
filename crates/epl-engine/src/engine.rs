//! Signal engine.
//!
//! Candidates for different symbols are processed in parallel. Candidates for
//! the same symbol are serialized by a per-symbol async lock held from
//! validation until the decision is recorded; dissemination runs after the
//! lock is released.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{DecisionLedger, DecisionRecord, Stats};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use epl_arbiter::{
    ActivePosition, ArbitrationEngine, CandidatePool, CandidateValidator, DuplicateMatch,
    ValidationError,
};
use epl_core::{Decision, SignalCandidate};
use epl_dispatch::{ChannelSet, DispatchReport, DisplayEntry, FocusEntry, ResearchRecord, TieredRouter};
use epl_telemetry::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Result of processing one candidate.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Admitted and decided (IGNORE included).
    Decided {
        decision: Decision,
        report: DispatchReport,
    },
    /// Dropped as a near-duplicate of a pooled candidate.
    Duplicate(DuplicateMatch),
    /// Dropped by validation.
    Rejected(ValidationError),
}

impl ProcessOutcome {
    /// `true` when a decision was produced.
    pub fn ok(&self) -> bool {
        matches!(self, Self::Decided { .. })
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::Decided { decision, .. } => Some(decision),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            Self::Decided { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn into_decision(self) -> Option<Decision> {
        match self {
            Self::Decided { decision, .. } => Some(decision),
            _ => None,
        }
    }
}

/// What one maintenance pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub positions_expired: usize,
    pub pool_pruned: usize,
    pub focus_pruned: usize,
    pub locks_pruned: usize,
}

pub struct SignalEngine {
    config: EngineConfig,
    validator: CandidateValidator,
    pool: CandidatePool,
    arbiter: ArbitrationEngine,
    router: TieredRouter,
    ledger: DecisionLedger,
    symbol_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    shutdown_token: CancellationToken,
    background: TaskTracker,
}

impl SignalEngine {
    /// Build an engine from validated configuration and a channel set.
    pub fn new(config: EngineConfig, channels: ChannelSet) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let arbiter = ArbitrationEngine::new(config.arbitration.clone(), config.priority.clone());

        info!(
            channels = ?channels.kinds(),
            max_active_positions = config.arbitration.max_active_positions,
            min_quality = %config.arbitration.min_quality_threshold,
            "Signal engine created"
        );

        Ok(Self {
            validator: CandidateValidator::new(config.validation.clone()),
            pool: CandidatePool::new(config.dedup.clone()),
            arbiter,
            router: TieredRouter::new(config.dispatch.clone(), channels),
            ledger: DecisionLedger::new(config.ledger.clone()),
            symbol_locks: DashMap::new(),
            shutdown_token: CancellationToken::new(),
            background: TaskTracker::new(),
            config,
        })
    }

    /// Run one candidate through the pipeline.
    pub async fn process_candidate(&self, candidate: SignalCandidate) -> ProcessOutcome {
        let start = Instant::now();
        self.ledger.candidate_seen();

        let lock = self.symbol_lock(&candidate.symbol);
        let guard = lock.lock().await;

        if let Err(e) = self.validator.validate(&candidate) {
            drop(guard);
            self.ledger.validation_rejected();
            Metrics::candidate_invalid();
            warn!(
                candidate_id = %candidate.id,
                symbol = %candidate.symbol,
                field = e.field(),
                error = %e,
                "Candidate rejected"
            );
            return ProcessOutcome::Rejected(e);
        }

        if let Some(hit) = self.pool.check_and_admit(&candidate) {
            drop(guard);
            self.ledger.duplicate_filtered();
            Metrics::candidate_duplicate(&candidate.symbol, hit.rule.as_str());
            return ProcessOutcome::Duplicate(hit);
        }
        Metrics::candidate_admitted();

        let decision = self.arbiter.decide(&candidate);
        self.ledger.record(&candidate, &decision);
        drop(guard);

        let report = self.router.dispatch(&candidate, &decision).await;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        Metrics::process_latency(decision.action.as_str(), latency_ms);
        info!(
            candidate_id = %decision.candidate_id,
            symbol = %decision.symbol,
            direction = %decision.direction,
            action = %decision.action,
            priority = %decision.priority,
            confidence_delta = %decision.confidence_delta,
            path = report.path.as_str(),
            latency_ms = latency_ms,
            "Candidate decided"
        );

        ProcessOutcome::Decided { decision, report }
    }

    fn symbol_lock(&self, symbol: &str) -> Arc<AsyncMutex<()>> {
        self.symbol_locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .value()
            .clone()
    }

    /// Ledger counters.
    pub fn snapshot(&self) -> Stats {
        self.ledger.snapshot()
    }

    /// Zero the ledger counters.
    pub fn reset(&self) {
        self.ledger.reset();
        info!("Ledger counters reset");
    }

    pub fn active_positions(&self) -> Vec<ActivePosition> {
        self.arbiter.registry().snapshot()
    }

    /// Operator release of a symbol's active position.
    pub fn release_position(&self, symbol: &str) -> Option<ActivePosition> {
        self.arbiter.registry().release(symbol)
    }

    pub fn recent_decisions(&self, n: usize) -> Vec<DecisionRecord> {
        self.ledger.recent(n)
    }

    pub fn decisions_for(&self, symbol: &str) -> Vec<DecisionRecord> {
        self.ledger.for_symbol(symbol)
    }

    pub fn focus_list(&self) -> Vec<FocusEntry> {
        self.router.focus_list()
    }

    pub fn display_history(&self, n: usize) -> Vec<DisplayEntry> {
        self.router.display_history(n)
    }

    pub fn research_records(&self, n: usize) -> Vec<ResearchRecord> {
        self.router.research_records(n)
    }

    pub fn router(&self) -> &TieredRouter {
        &self.router
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One maintenance pass at `now`.
    pub fn run_maintenance_at(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let before = self.symbol_locks.len();
        // Only the map holds an idle lock
        self.symbol_locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        let report = MaintenanceReport {
            positions_expired: self.arbiter.registry().sweep_expired(now),
            pool_pruned: self.pool.prune(now),
            focus_pruned: self.router.prune(now),
            locks_pruned: before.saturating_sub(self.symbol_locks.len()),
        };
        debug!(?report, "Maintenance pass");
        report
    }

    pub fn run_maintenance(&self) -> MaintenanceReport {
        self.run_maintenance_at(Utc::now())
    }

    /// Start the periodic maintenance task.
    ///
    /// Returns `false` after shutdown.
    pub fn spawn_maintenance(self: &Arc<Self>) -> bool {
        if self.shutdown_token.is_cancelled() {
            return false;
        }

        let engine = Arc::clone(self);
        let token = self.shutdown_token.clone();
        let period = self.config.maintenance.interval();
        self.background.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        engine.run_maintenance();
                    }
                }
            }
            debug!("Maintenance task stopped");
        });
        info!(interval_secs = period.as_secs(), "Maintenance task started");
        true
    }

    /// Stop background work and cancel scheduled dissemination.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        self.background.close();
        self.background.wait().await;
        self.router.shutdown().await;

        let stats = self.ledger.snapshot();
        info!(
            total_candidates = stats.total_candidates,
            decisions = stats.decisions_processed,
            duplicates = stats.duplicates_filtered,
            rejected = stats.validation_rejected,
            active_positions = self.arbiter.registry().len(),
            "Signal engine stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epl_core::{Action, Direction, Priority};
    use rust_decimal_macros::dec;

    fn engine() -> SignalEngine {
        SignalEngine::new(EngineConfig::default(), ChannelSet::new()).unwrap()
    }

    #[tokio::test]
    async fn test_rejected_candidate_counts_and_yields_no_decision() {
        let engine = engine();
        let c = SignalCandidate::new("BTC USDT", Direction::Long, dec!(0.8), dec!(85), ["rsi"]);

        let outcome = engine.process_candidate(c).await;
        assert!(!outcome.ok());
        assert!(matches!(outcome, ProcessOutcome::Rejected(_)));

        let stats = engine.snapshot();
        assert_eq!(stats.total_candidates, 1);
        assert_eq!(stats.validation_rejected, 1);
        assert_eq!(stats.decisions_processed, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.ledger.trim_to = 5000;
        let err = SignalEngine::new(config, ChannelSet::new()).err().unwrap();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_decided_outcome_accessors() {
        let engine = engine();
        let c = SignalCandidate::new("BTCUSDT", Direction::Long, dec!(0.8), dec!(85), ["rsi"]);
        let outcome = engine.process_candidate(c).await;

        assert!(outcome.ok());
        assert_eq!(outcome.decision().unwrap().action, Action::NewOrder);
        assert_eq!(outcome.decision().unwrap().priority, Priority::High);
        assert_eq!(outcome.report().unwrap().scheduled, 0);
        assert_eq!(engine.recent_decisions(1).len(), 1);
    }

    #[tokio::test]
    async fn test_maintenance_sweeps_expired_state() {
        let engine = engine();
        let c = SignalCandidate::new("BTCUSDT", Direction::Long, dec!(0.8), dec!(85), ["rsi"]);
        engine.process_candidate(c).await;
        assert_eq!(engine.active_positions().len(), 1);

        let later = Utc::now() + chrono::Duration::hours(25);
        let report = engine.run_maintenance_at(later);
        assert_eq!(report.positions_expired, 1);
        assert_eq!(report.pool_pruned, 1);
        assert_eq!(report.locks_pruned, 1);
        assert!(engine.active_positions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_maintenance_task_stops_on_shutdown() {
        let engine = Arc::new(engine());
        assert!(engine.spawn_maintenance());
        tokio::time::sleep(std::time::Duration::from_secs(125)).await;
        engine.shutdown().await;
        assert!(!engine.spawn_maintenance());
    }
}
