//! Prometheus metrics and structured logging for EPL.
//!
//! Provides:
//! - Prometheus metrics for candidates, decisions, registry and dissemination
//! - Structured JSON logging with tracing
//! - Periodic decision statistics summary

pub mod error;
pub mod logging;
pub mod metrics;
pub mod stats_report;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use stats_report::{DecisionStatsReporter, DecisionStatsSummary, TierLatency};
