//! EPL pipeline orchestration.
//!
//! `SignalEngine` runs each candidate through:
//! validate → dedup → arbitrate/classify → ledger → dissemination.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;

pub use config::{EngineConfig, MaintenanceConfig};
pub use engine::{MaintenanceReport, ProcessOutcome, SignalEngine};
pub use error::{EngineError, EngineResult};
pub use ledger::{DecisionLedger, DecisionRecord, LedgerConfig, Stats};
