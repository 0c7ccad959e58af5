//! Engine configuration.

use crate::ledger::LedgerConfig;
use epl_arbiter::{ArbitrationConfig, DedupConfig, PriorityThresholds, ValidationConfig};
use epl_dispatch::DispatchConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregated configuration for the whole pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub arbitration: ArbitrationConfig,
    #[serde(default)]
    pub priority: PriorityThresholds,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// Periodic maintenance (registry sweep, pool prune, lock cleanup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl EngineConfig {
    /// Validate every section, prefixing errors with the section name.
    pub fn validate(&self) -> Result<(), String> {
        self.validation
            .validate()
            .map_err(|e| format!("validation: {e}"))?;
        self.dedup.validate().map_err(|e| format!("dedup: {e}"))?;
        self.arbitration
            .validate()
            .map_err(|e| format!("arbitration: {e}"))?;
        self.priority
            .validate()
            .map_err(|e| format!("priority: {e}"))?;
        self.dispatch
            .validate()
            .map_err(|e| format!("dispatch: {e}"))?;
        self.ledger.validate().map_err(|e| format!("ledger: {e}"))?;
        if self.maintenance.interval_secs == 0 {
            return Err("maintenance: interval_secs must be positive".to_string());
        }
        Ok(())
    }
}
