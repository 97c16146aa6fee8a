//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument, defaulting
//! to config/default.toml. Calibration results are written back into the
//! `[calibration]` table of the same file.

use crate::domain::{SensorBaseline, TdtWindow};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site identifier included in log output
    #[serde(default = "default_site_id")]
    pub id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

fn default_site_id() -> String {
    "trafficmeter".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorsConfig {
    /// I2C bus device node both sensors sit on
    #[serde(default = "default_i2c_bus")]
    pub bus: String,
    /// I2C address of the sensor nearest the doorway
    pub entry_address: u8,
    /// I2C address of the sensor farthest from the doorway
    pub exit_address: u8,
}

fn default_i2c_bus() -> String {
    "/dev/i2c-1".to_string()
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self { bus: default_i2c_bus(), entry_address: 0x30, exit_address: 0x31 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Steady-state poll cadence of the resolver loop
    pub poll_interval_ms: u64,
    /// How long a candidate crossing may wait for confirmation
    pub event_timeout_ms: u64,
    /// Dead-time after an emitted event before a new candidate is accepted
    pub reset_time_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 50, event_timeout_ms: 2000, reset_time_ms: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub min_tdt_mm: u16,
    pub max_tdt_mm: u16,
    pub entry_baseline_mm: u16,
    pub exit_baseline_mm: u16,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        // VL53L0X out-of-range ceiling; forces a calibration pass before the
        // window matches anything real
        Self {
            min_tdt_mm: 8190,
            max_tdt_mm: 8190,
            entry_baseline_mm: 8190,
            exit_baseline_mm: 8190,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily traffic CSVs
    pub logs_dir: String,
    /// File name pattern; `{date}` is replaced with the day key
    pub file_name_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logs_dir: "logs".to_string(),
            file_name_format: "{date}_foot_traffic.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    i2c_bus: String,
    entry_sensor_address: u8,
    exit_sensor_address: u8,
    poll_interval_ms: u64,
    event_timeout_ms: u64,
    reset_time_ms: u64,
    min_tdt_mm: u16,
    max_tdt_mm: u16,
    entry_baseline_mm: u16,
    exit_baseline_mm: u16,
    logs_dir: String,
    file_name_format: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            site_id: toml_config.site.id,
            i2c_bus: toml_config.sensors.bus,
            entry_sensor_address: toml_config.sensors.entry_address,
            exit_sensor_address: toml_config.sensors.exit_address,
            poll_interval_ms: toml_config.timing.poll_interval_ms,
            event_timeout_ms: toml_config.timing.event_timeout_ms,
            reset_time_ms: toml_config.timing.reset_time_ms,
            min_tdt_mm: toml_config.calibration.min_tdt_mm,
            max_tdt_mm: toml_config.calibration.max_tdt_mm,
            entry_baseline_mm: toml_config.calibration.entry_baseline_mm,
            exit_baseline_mm: toml_config.calibration.exit_baseline_mm,
            logs_dir: toml_config.logging.logs_dir,
            file_name_format: toml_config.logging.file_name_format,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Rewrite the `[calibration]` table of the config file in place.
    ///
    /// Other sections are preserved as currently on disk; a missing or
    /// unreadable file is recreated from defaults plus the new calibration.
    pub fn persist_calibration(
        path: &str,
        window: TdtWindow,
        baseline: SensorBaseline,
    ) -> anyhow::Result<()> {
        let mut toml_config: TomlConfig = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path))?,
            Err(_) => TomlConfig::default(),
        };

        toml_config.calibration = CalibrationConfig {
            min_tdt_mm: window.min_mm,
            max_tdt_mm: window.max_mm,
            entry_baseline_mm: baseline.entry_mm,
            exit_baseline_mm: baseline.exit_mm,
        };

        let serialized = toml::to_string_pretty(&toml_config)
            .context("Failed to serialize configuration")?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config file {}", path))?;
        Ok(())
    }

    /// Calibrated TDT window from the `[calibration]` table
    pub fn tdt_window(&self) -> TdtWindow {
        TdtWindow::new(self.min_tdt_mm, self.max_tdt_mm)
    }

    /// Calibrated per-sensor baselines from the `[calibration]` table
    pub fn baseline(&self) -> SensorBaseline {
        SensorBaseline { entry_mm: self.entry_baseline_mm, exit_mm: self.exit_baseline_mm }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn i2c_bus(&self) -> &str {
        &self.i2c_bus
    }

    pub fn entry_sensor_address(&self) -> u8 {
        self.entry_sensor_address
    }

    pub fn exit_sensor_address(&self) -> u8 {
        self.exit_sensor_address
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }

    pub fn reset_time(&self) -> Duration {
        Duration::from_millis(self.reset_time_ms)
    }

    pub fn logs_dir(&self) -> &str {
        &self.logs_dir
    }

    pub fn file_name_format(&self) -> &str {
        &self.file_name_format
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the timing fields
    #[cfg(test)]
    pub fn with_timing(mut self, poll_ms: u64, timeout_ms: u64, reset_ms: u64) -> Self {
        self.poll_interval_ms = poll_ms;
        self.event_timeout_ms = timeout_ms;
        self.reset_time_ms = reset_ms;
        self
    }
}
