//! Planner configuration loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::network::Frequency;
use crate::network::history::DEFAULT_HISTORY_CAPACITY;

/// Computation and reporting settings, read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Level injected by the base station at every source-side antenna/load (dBm).
    pub base_station_signal: f64,
    /// Operating band.
    pub frequency: Frequency,
    /// Below this level (dBm) a node is reported as weak.
    pub weak_signal_threshold: f64,
    /// At or above this level (dBm) a node is reported as excellent.
    pub excellent_signal_threshold: f64,
    /// Undo steps kept while editing.
    pub history_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_station_signal: 30.0,
            frequency: Frequency::default(),
            weak_signal_threshold: -85.0,
            excellent_signal_threshold: -65.0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the config.toml file
    ///
    /// # Returns
    /// * `Ok(PlannerConfig)` if the file was successfully loaded, parsed and validated
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::parse(&content)
    }

    /// Like [`PlannerConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(config_path: &Path) -> Result<Self, String> {
        if !config_path.exists() {
            log::debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load(config_path)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let config: PlannerConfig = toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.weak_signal_threshold >= self.excellent_signal_threshold {
            return Err(format!(
                "Invalid signal thresholds: weak {} dBm must be less than excellent {} dBm",
                self.weak_signal_threshold, self.excellent_signal_threshold
            ));
        }
        if self.history_capacity == 0 {
            return Err("Invalid history-capacity, must be at least 1".to_string());
        }
        Ok(())
    }

    /// Derive the config path from a plan file path.
    ///
    /// Replaces the plan filename with "config.toml" in the same directory.
    pub fn config_path_from_plan(plan_path: &Path) -> PathBuf {
        plan_path.parent().unwrap_or(Path::new(".")).join("config.toml")
    }
}
