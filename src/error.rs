//! # Error Types
//!
//! Custom error types for Sensor Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Sensor Bridge
#[derive(Debug, Error)]
pub enum SensorBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Two sensor definitions share the same routing key
    #[error("Duplicate sensor id: {0}")]
    DuplicateSensor(String),

    /// A payload could not be converted into a typed reading
    #[error("Invalid reading for {sensor_id}: {reason}")]
    InvalidReading {
        /// Routing key of the sensor that rejected the payload
        sensor_id: String,
        /// Why the payload was rejected
        reason: String,
    },
}

/// Result type alias for Sensor Bridge
pub type Result<T> = std::result::Result<T, SensorBridgeError>;
