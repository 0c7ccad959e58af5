//! Main application loop.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::feed::CandidateFeed;
use epl_dispatch::{ChannelSet, LogChannel};
use epl_engine::{ProcessOutcome, SignalEngine};
use epl_telemetry::DecisionStatsReporter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub received: u64,
    pub decided: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub malformed: u64,
}

impl RunSummary {
    fn count(&mut self, outcome: &ProcessOutcome) {
        self.received += 1;
        match outcome {
            ProcessOutcome::Decided { .. } => self.decided += 1,
            ProcessOutcome::Duplicate(_) => self.duplicates += 1,
            ProcessOutcome::Rejected(_) => self.rejected += 1,
        }
    }
}

pub struct Application {
    config: AppConfig,
    engine: Arc<SignalEngine>,
    stats: DecisionStatsReporter,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let channels = config
            .channels
            .enabled
            .iter()
            .fold(ChannelSet::new(), |set, kind| {
                set.with(Arc::new(LogChannel::new(*kind)))
            });
        let engine = Arc::new(SignalEngine::new(config.engine.clone(), channels)?);

        Ok(Self {
            config,
            engine,
            stats: DecisionStatsReporter::new(),
        })
    }

    pub fn engine(&self) -> &Arc<SignalEngine> {
        &self.engine
    }

    /// Feed candidates through the engine until end of input or Ctrl-C.
    pub async fn run(&mut self) -> AppResult<RunSummary> {
        let mut feed = CandidateFeed::open(self.config.feed.path()).await?;
        self.run_feed(&mut feed).await
    }

    /// Same as [`run`](Self::run) with an already opened feed.
    pub async fn run_feed(&mut self, feed: &mut CandidateFeed) -> AppResult<RunSummary> {
        self.engine.spawn_maintenance();

        info!("Entering main event loop");
        let mut summary = RunSummary::default();
        let mut stats_interval = tokio::time::interval(self.config.telemetry.stats_interval());
        // first tick completes immediately
        stats_interval.tick().await;

        let result = loop {
            tokio::select! {
                next = feed.next() => {
                    match next {
                        Ok(Some(candidate)) => {
                            let outcome = self.engine.process_candidate(candidate).await;
                            summary.count(&outcome);
                        }
                        Ok(None) => {
                            info!("End of input");
                            break Ok(());
                        }
                        Err(e) => {
                            error!(error = %e, "Feed error");
                            break Err(e);
                        }
                    }
                }

                _ = stats_interval.tick() => {
                    info!("Outputting periodic statistics summary");
                    self.stats.output_summary();
                    let snapshot = self.engine.snapshot();
                    info!(
                        total_candidates = snapshot.total_candidates,
                        decisions = snapshot.decisions_processed,
                        history_len = snapshot.history_len,
                        active_positions = self.engine.active_positions().len(),
                        focus = self.engine.focus_list().len(),
                        "Ledger snapshot"
                    );
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break Ok(());
                }
            }
        };

        summary.malformed = feed.malformed();
        self.engine.shutdown().await;

        info!("Final statistics summary:");
        self.stats.output_summary();
        info!(
            received = summary.received,
            decided = summary.decided,
            duplicates = summary.duplicates,
            rejected = summary.rejected,
            malformed = summary.malformed,
            "Run complete"
        );

        result.map(|()| summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epl_core::Action;

    fn feed(lines: &[&str]) -> CandidateFeed {
        let input = lines.join("\n");
        CandidateFeed::from_reader(Box::new(std::io::Cursor::new(input.into_bytes())))
    }

    #[tokio::test]
    async fn test_run_until_end_of_input() {
        let mut app = Application::new(AppConfig::default()).unwrap();
        let mut feed = feed(&[
            r#"{"symbol":"BTCUSDT","direction":"LONG","confidence":"0.80","quality_score":"85","indicators":["rsi"]}"#,
            r#"{"symbol":"BTCUSDT","direction":"LONG","confidence":"0.81","quality_score":"85","indicators":["rsi"]}"#,
            r#"{"symbol":"BTC USDT","direction":"LONG","confidence":"0.80","quality_score":"85"}"#,
            r#"{"symbol":"ETHUSDT","direction":"LONG","confidence":"0.50","quality_score":"40"}"#,
            "not json",
        ]);

        let summary = app.run_feed(&mut feed).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                received: 4,
                decided: 2,
                duplicates: 1,
                rejected: 1,
                malformed: 1,
            }
        );

        let recent = app.engine().recent_decisions(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].decision.action, Action::Ignore);
        assert_eq!(recent[1].decision.action, Action::NewOrder);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.telemetry.stats_interval_secs = 0;
        assert!(Application::new(config).is_err());
    }
}
