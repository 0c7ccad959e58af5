//! Dissemination configuration.

use epl_core::Priority;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Message time to live per tier (seconds).
    #[serde(default = "default_critical_ttl_secs")]
    pub critical_ttl_secs: u64,
    #[serde(default = "default_high_ttl_secs")]
    pub high_ttl_secs: u64,
    #[serde(default = "default_medium_ttl_secs")]
    pub medium_ttl_secs: u64,
    #[serde(default = "default_low_ttl_secs")]
    pub low_ttl_secs: u64,

    /// HIGH tier: delay before the follow-up email (seconds).
    #[serde(default = "default_high_email_delay_secs")]
    pub high_email_delay_secs: u64,

    /// MEDIUM tier: decisions within the window that trigger a summary.
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,
    /// MEDIUM tier: trailing batch window (seconds).
    #[serde(default = "default_batch_window_secs")]
    pub batch_window_secs: u64,

    /// Focus watch-list entry lifetime (seconds).
    #[serde(default = "default_focus_ttl_secs")]
    pub focus_ttl_secs: u64,

    #[serde(default = "default_display_history_cap")]
    pub display_history_cap: usize,
    #[serde(default = "default_research_capture_cap")]
    pub research_capture_cap: usize,

    /// Upper bound on a single adapter send (ms).
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Confidence at or above which a CRITICAL decision is assessed SEVERE.
    #[serde(default = "default_severe_confidence")]
    pub severe_confidence: Decimal,
}

fn default_critical_ttl_secs() -> u64 {
    5 * 60
}

fn default_high_ttl_secs() -> u64 {
    15 * 60
}

fn default_medium_ttl_secs() -> u64 {
    60 * 60
}

fn default_low_ttl_secs() -> u64 {
    240 * 60
}

fn default_high_email_delay_secs() -> u64 {
    5 * 60
}

fn default_batch_threshold() -> usize {
    5
}

fn default_batch_window_secs() -> u64 {
    60 * 60
}

fn default_focus_ttl_secs() -> u64 {
    60 * 60
}

fn default_display_history_cap() -> usize {
    200
}

fn default_research_capture_cap() -> usize {
    1000
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_severe_confidence() -> Decimal {
    Decimal::new(95, 2) // 0.95
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            critical_ttl_secs: default_critical_ttl_secs(),
            high_ttl_secs: default_high_ttl_secs(),
            medium_ttl_secs: default_medium_ttl_secs(),
            low_ttl_secs: default_low_ttl_secs(),
            high_email_delay_secs: default_high_email_delay_secs(),
            batch_threshold: default_batch_threshold(),
            batch_window_secs: default_batch_window_secs(),
            focus_ttl_secs: default_focus_ttl_secs(),
            display_history_cap: default_display_history_cap(),
            research_capture_cap: default_research_capture_cap(),
            send_timeout_ms: default_send_timeout_ms(),
            severe_confidence: default_severe_confidence(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, ttl) in [
            ("critical_ttl_secs", self.critical_ttl_secs),
            ("high_ttl_secs", self.high_ttl_secs),
            ("medium_ttl_secs", self.medium_ttl_secs),
            ("low_ttl_secs", self.low_ttl_secs),
        ] {
            if ttl == 0 {
                return Err(format!("{name} must be positive"));
            }
        }
        // The delayed email must still be live when it fires
        if self.high_email_delay_secs >= self.high_ttl_secs {
            return Err(format!(
                "high_email_delay_secs ({}) must be < high_ttl_secs ({})",
                self.high_email_delay_secs, self.high_ttl_secs
            ));
        }
        if self.batch_threshold == 0 {
            return Err("batch_threshold must be positive".to_string());
        }
        if self.batch_window_secs == 0 {
            return Err("batch_window_secs must be positive".to_string());
        }
        if self.send_timeout_ms == 0 {
            return Err("send_timeout_ms must be positive".to_string());
        }
        if self.severe_confidence.is_sign_negative() || self.severe_confidence > Decimal::ONE {
            return Err(format!(
                "severe_confidence ({}) must be within [0, 1]",
                self.severe_confidence
            ));
        }
        Ok(())
    }

    /// Message time to live for a tier.
    pub fn ttl(&self, priority: Priority) -> chrono::Duration {
        let secs = match priority {
            Priority::Critical => self.critical_ttl_secs,
            Priority::High => self.high_ttl_secs,
            Priority::Medium => self.medium_ttl_secs,
            Priority::Low => self.low_ttl_secs,
        };
        chrono::Duration::seconds(secs as i64)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn high_email_delay(&self) -> Duration {
        Duration::from_secs(self.high_email_delay_secs)
    }

    pub fn batch_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.batch_window_secs as i64)
    }

    pub fn focus_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.focus_ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DispatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ttl(Priority::Critical), chrono::Duration::minutes(5));
        assert_eq!(config.ttl(Priority::Low), chrono::Duration::minutes(240));
        assert_eq!(config.send_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_email_delay_must_fit_ttl() {
        let config = DispatchConfig {
            high_email_delay_secs: 900,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("high_email_delay_secs"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DispatchConfig = serde_json::from_str(r#"{"batch_threshold": 3}"#).unwrap();
        assert_eq!(config.batch_threshold, 3);
        assert_eq!(config.focus_ttl_secs, 3600);
    }
}
