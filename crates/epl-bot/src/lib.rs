//! EPL runner.
//!
//! Reads signal candidates as JSON lines, pushes them through the
//! `SignalEngine`, disseminates through log-only channels and prints
//! periodic statistics.

pub mod app;
pub mod config;
pub mod error;
pub mod feed;

pub use app::{Application, RunSummary};
pub use config::{AppConfig, ChannelsConfig, FeedConfig, TelemetryConfig};
pub use error::{AppError, AppResult};
pub use feed::{parse_line, CandidateFeed, FeedRecord};
