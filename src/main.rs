//! # Sensor Bridge
//!
//! Reads live sensor telemetry (accelerometer, temperature, pressure)
//! from a serial link and keeps a queryable in-memory time series per
//! sensor. The dashboard polls the query interface; this binary's status
//! loop stands in for it by logging the latest values periodically.

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::info;

use sensor_bridge::channel::serial::SerialChannel;
use sensor_bridge::channel::Channel;
use sensor_bridge::config::Config;
use sensor_bridge::query::get_latest_values;
use sensor_bridge::sensor::catalog::{builtin_definitions, deregister_all, discover};

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Seconds between latest-value status reports
const STATUS_INTERVAL_SECS: u64 = 5;

/// Main entry point for Sensor Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (built-in defaults if the file is absent)
///    - Open the serial channel; its background task connects and
///      reconnects on its own
///    - Discover sensors and bind them to the channel
///
/// 2. **Main Loop**
///    - Report each sensor's latest values every few seconds
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Deregister sensor handlers
///    - Close the channel and exit
///
/// # Errors
///
/// Returns error if the configuration is invalid or the sensor catalog
/// contains duplicate ids. A missing or unplugged serial device is not
/// fatal; the channel keeps retrying until it appears.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Sensor Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;
    info!(
        "Serial port {} at {} baud (reconnect every {}ms)",
        config.serial.port, config.serial.baud_rate, config.serial.reconnect_interval_ms
    );

    let channel = SerialChannel::open(config.serial.clone());
    let sensors = discover(&channel, builtin_definitions(), config.history.max_readings)?;
    info!("Listening for {} sensors", sensors.len());
    info!("Press Ctrl+C to exit");

    let mut status_interval = interval(Duration::from_secs(STATUS_INTERVAL_SECS));

    // Main loop
    loop {
        tokio::select! {
            // Periodic status report, standing in for the dashboard poll
            _ = status_interval.tick() => {
                for sensor in &sensors {
                    let values = get_latest_values(sensor, &config.display);
                    let summary = values
                        .iter()
                        .map(|(field, value)| format!("{field}={value}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    info!("{}: {}", sensor.definition().display_name, summary);
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    deregister_all(&channel, &sensors);
    channel.close();
    info!("Sensor Bridge stopped");

    Ok(())
}
