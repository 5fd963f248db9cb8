//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::query::TemperatureUnit;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Display options applied on the query side (never to stored data)
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    #[serde(default = "default_accel_scale")]
    pub accel_scale: f64,
}

/// Reading history retention
#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Maximum readings kept per sensor. `None` keeps everything for the
    /// process lifetime.
    #[serde(default)]
    pub max_readings: Option<usize>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115_200 }
fn default_timeout_ms() -> u64 { 1000 }
fn default_reconnect_interval_ms() -> u64 { 5000 }

fn default_accel_scale() -> f64 { 1.0 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::default(),
            accel_scale: default_accel_scale(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_readings: None }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            display: DisplayConfig::default(),
            history: HistoryConfig::default(),
        }
    }
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
    /// use sensor_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to built-in
    /// defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::SensorBridgeError::Config(
                toml::de::Error::custom("serial port cannot be empty"),
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(crate::error::SensorBridgeError::Config(
                toml::de::Error::custom("serial baud_rate must be non-zero"),
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.reconnect_interval_ms == 0 {
            return Err(crate::error::SensorBridgeError::Config(
                toml::de::Error::custom(
                    "serial timeout_ms and reconnect_interval_ms must be non-zero",
                ),
            ));
        }

        if !self.display.accel_scale.is_finite() {
            return Err(crate::error::SensorBridgeError::Config(
                toml::de::Error::custom("display accel_scale must be finite"),
            ));
        }

        if self.history.max_readings == Some(0) {
            return Err(crate::error::SensorBridgeError::Config(
                toml::de::Error::custom("history max_readings must be at least 1 when set"),
            ));
        }

        Ok(())
    }
}
