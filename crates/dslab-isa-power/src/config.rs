//! Power accounting configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cell::PowerCell;
use crate::error::ConfigError;
use crate::loader::load_table;
use crate::stats::{CorePowerStats, DEFAULT_RESTART_CYCLES, DEFAULT_TRANSITION_CYCLES};
use crate::window::{CsvWindowReporter, DEFAULT_WINDOW_SIZE};

/// Holds raw configuration values, absent values are replaced with defaults.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct RawPowerStatsConfig {
    /// power table file, relative paths are resolved against the config file directory
    pub table_path: PathBuf,
    /// number of instructions in a reporting window
    pub window_size: Option<u64>,
    /// write closed windows to a CSV file
    pub window_report: Option<bool>,
    /// directory of window report files
    pub window_report_dir: Option<PathBuf>,
    /// window report file name prefix, the core name is appended
    pub window_report_prefix: Option<String>,
    /// NOP cycles charged for an operating point switch
    pub transition_cycles: Option<u64>,
    /// NOP cycles charged for a restart from idle
    pub restart_cycles: Option<u64>,
}

/// Power accounting configuration.
#[derive(Debug, PartialEq, Clone)]
pub struct PowerStatsConfig {
    pub table_path: PathBuf,
    pub window_size: u64,
    pub window_report: bool,
    pub window_report_dir: PathBuf,
    pub window_report_prefix: String,
    pub transition_cycles: u64,
    pub restart_cycles: u64,
}

impl PowerStatsConfig {
    /// Creates config with default parameter values.
    pub fn new<P: Into<PathBuf>>(table_path: P) -> Self {
        Self {
            table_path: table_path.into(),
            window_size: DEFAULT_WINDOW_SIZE,
            window_report: true,
            window_report_dir: PathBuf::from("."),
            window_report_prefix: "window_power_report".to_string(),
            transition_cycles: DEFAULT_TRANSITION_CYCLES,
            restart_cycles: DEFAULT_RESTART_CYCLES,
        }
    }

    /// Creates config from raw values.
    pub fn from_raw(raw: RawPowerStatsConfig) -> Self {
        let default = Self::new(raw.table_path);
        Self {
            window_size: raw.window_size.unwrap_or(default.window_size),
            window_report: raw.window_report.unwrap_or(default.window_report),
            window_report_dir: raw.window_report_dir.unwrap_or_else(|| default.window_report_dir.clone()),
            window_report_prefix: raw
                .window_report_prefix
                .unwrap_or_else(|| default.window_report_prefix.clone()),
            transition_cycles: raw.transition_cycles.unwrap_or(default.transition_cycles),
            restart_cycles: raw.restart_cycles.unwrap_or(default.restart_cycles),
            table_path: default.table_path,
        }
    }

    /// Reads config from YAML file (uses default values if some parameters are absent).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawPowerStatsConfig = serde_yaml::from_reader(file).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_raw(raw);
        if config.table_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.table_path = dir.join(&config.table_path);
            }
        }
        Ok(config)
    }

    /// Returns the window report file of core `name`.
    pub fn window_report_path(&self, name: &str) -> PathBuf {
        self.window_report_dir
            .join(format!("{}_{}.csv", self.window_report_prefix, name))
    }
}

impl CorePowerStats {
    /// Loads the power table and creates statistics of core `name` configured by `config`.
    pub fn from_config(name: &str, config: &PowerStatsConfig) -> Result<Self, ConfigError> {
        let table = load_table(&config.table_path)?;
        let mut stats = CorePowerStats::new(name, table)
            .with_window_size(config.window_size)
            .with_transition_cycles(config.transition_cycles)
            .with_restart_cycles(config.restart_cycles);
        if config.window_report {
            let path = config.window_report_path(name);
            let reporter =
                CsvWindowReporter::from_path(&path).map_err(|source| ConfigError::Report { path, source })?;
            stats = stats.with_window_reporter(Box::new(reporter));
        }
        Ok(stats)
    }

    /// Same as [`from_config`](Self::from_config) and registers the core in `cell`.
    pub fn from_config_with_cell(
        name: &str,
        config: &PowerStatsConfig,
        cell: Box<dyn PowerCell>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_config(name, config)?.with_power_cell(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_absent_values() {
        let raw: RawPowerStatsConfig = serde_yaml::from_str("table_path: table.csv\nwindow_size: 50\n").unwrap();
        let config = PowerStatsConfig::from_raw(raw);
        assert_eq!(config.window_size, 50);
        assert!(config.window_report);
        assert_eq!(config.transition_cycles, 20000);
        assert_eq!(config.restart_cycles, 300);
        assert_eq!(
            config.window_report_path("cpu0"),
            PathBuf::from("./window_power_report_cpu0.csv")
        );
    }

    #[test]
    fn test_missing_table_path() {
        assert!(serde_yaml::from_str::<RawPowerStatsConfig>("window_size: 50\n").is_err());
    }
}
