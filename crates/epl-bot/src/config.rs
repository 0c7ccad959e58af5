//! Application configuration.

use crate::error::{AppError, AppResult};
use epl_core::ChannelKind;
use epl_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Channels to wire up as log-only adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_enabled_channels")]
    pub enabled: Vec<ChannelKind>,
}

fn default_enabled_channels() -> Vec<ChannelKind> {
    ChannelKind::ALL.to_vec()
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_channels(),
        }
    }
}

/// Candidate input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// JSONL file path; stdin when unset or "-".
    #[serde(default)]
    pub input: Option<String>,
}

impl FeedConfig {
    /// Input path, `None` meaning stdin.
    pub fn path(&self) -> Option<&str> {
        self.input.as_deref().filter(|p| *p != "-" && !p.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Statistics summary interval (seconds).
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_stats_interval_secs() -> u64 {
    300
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl TelemetryConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        self.engine.validate().map_err(AppError::Config)?;
        if self.telemetry.stats_interval_secs == 0 {
            return Err(AppError::Config(
                "telemetry: stats_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bundled_default_config_parses() {
        let config = AppConfig::from_toml(include_str!("../../../config/default.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.arbitration.max_active_positions, 10);
        assert_eq!(config.engine.dedup.confidence_threshold, dec!(0.03));
        assert_eq!(config.channels.enabled.len(), 5);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert!(config.validate().is_ok());
        assert!(config.feed.path().is_none());
        assert_eq!(config.telemetry.stats_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml(
            r#"
            [engine.arbitration]
            min_quality_threshold = "75"

            [channels]
            enabled = ["push", "display"]

            [feed]
            input = "-"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.arbitration.min_quality_threshold, dec!(75));
        assert_eq!(config.engine.arbitration.max_active_positions, 10);
        assert_eq!(
            config.channels.enabled,
            vec![ChannelKind::Push, ChannelKind::Display]
        );
        assert!(config.feed.path().is_none());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let config = AppConfig::from_toml(
            r#"
            [engine.priority]
            critical = "80"
            high = "80"
            medium = "70"
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("priority"));
    }
}
