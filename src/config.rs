//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and key has a default, so an empty file (or no file at all)
//! yields a usable configuration pointing at the stock TruckTrace server.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub firmware: FirmwareConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// TruckTrace server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Identity of the tracker this process reports for
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceConfig {
    #[serde(default)]
    pub hardware_id: String,

    #[serde(default)]
    pub vehicle_name: String,
}

/// Reporting cadence configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReportingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_test_batch_count")]
    pub test_batch_count: usize,

    #[serde(default = "default_test_batch_delay_ms")]
    pub test_batch_delay_ms: u64,
}

/// Serial GPS receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    /// Empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_gps_baud_rate")]
    pub baud_rate: u32,
}

/// Generated firmware configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FirmwareConfig {
    #[serde(default)]
    pub wifi_ssid: String,

    #[serde(default)]
    pub wifi_password: String,

    #[serde(default = "default_server_ip")]
    pub server_ip: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

/// Delivery journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty disables the rolling log file
    #[serde(default)]
    pub file_dir: String,
}

// Default value functions
fn default_base_url() -> String { "http://192.168.29.238:8080".to_string() }
fn default_health_timeout_ms() -> u64 { 5000 }
fn default_request_timeout_ms() -> u64 { 10000 }

fn default_interval_ms() -> u64 { 10000 }
fn default_test_batch_count() -> usize { 5 }
fn default_test_batch_delay_ms() -> u64 { 2000 }

fn default_gps_baud_rate() -> u32 { 9600 }

fn default_server_ip() -> String { "192.168.29.238".to_string() }
fn default_server_port() -> u16 { 8080 }
fn default_output_dir() -> String { ".".to_string() }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            health_timeout_ms: default_health_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            test_batch_count: default_test_batch_count(),
            test_batch_delay_ms: default_test_batch_delay_ms(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_gps_baud_rate(),
        }
    }
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            server_ip: default_server_ip(),
            server_port: default_server_port(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ReportingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn test_batch_delay(&self) -> Duration {
        Duration::from_millis(self.test_batch_delay_ms)
    }
}

fn invalid(msg: impl std::fmt::Display) -> TrackerError {
    TrackerError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use trucktrace_tracker::config::Config;
    ///
    /// let config = Config::load("config/tracker.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let url = self.server.base_url.trim();
        if url.is_empty() {
            return Err(invalid("server base_url cannot be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("server base_url must start with http:// or https://"));
        }

        for (name, value) in [
            ("health_timeout_ms", self.server.health_timeout_ms),
            ("request_timeout_ms", self.server.request_timeout_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        if self.reporting.interval_ms == 0 || self.reporting.interval_ms > 3_600_000 {
            return Err(invalid("interval_ms must be between 1 and 3600000"));
        }

        if self.reporting.test_batch_count == 0 || self.reporting.test_batch_count > 1000 {
            return Err(invalid("test_batch_count must be between 1 and 1000"));
        }

        if self.reporting.test_batch_delay_ms > 60000 {
            return Err(invalid("test_batch_delay_ms must be at most 60000"));
        }

        if ![4800, 9600, 19200, 38400, 57600, 115200].contains(&self.gps.baud_rate) {
            return Err(invalid("baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200"));
        }

        if self.firmware.server_port == 0 {
            return Err(invalid("firmware server_port must be greater than 0"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(format!(
                "logging level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        Ok(())
    }
}
