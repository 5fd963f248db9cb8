//! # Snapshot Query Module
//!
//! The read-side contract consumed by the presentation layer: per-field
//! time series, formatted latest values, and display-unit transforms.
//!
//! Transforms are pure functions over a snapshot's copy; the holder's
//! stored log always stays in raw/canonical units (Celsius, unscaled
//! acceleration).

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::DisplayConfig;
use crate::sensor::catalog::{ACCEL_SENSOR_ID, PRESSURE_SENSOR_ID, TEMP_SENSOR_ID};
use crate::sensor::SensorState;

/// Value shown for a field before its first reading arrives
pub const UNAVAILABLE: &str = "N/A";

/// Temperature display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Display symbol for the unit.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// Convert a temperature from Celsius to Fahrenheit.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Time series of one sensor field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSeries {
    pub field: String,
    pub points: Vec<(DateTime<Utc>, f64)>,
}

/// Display transform for one stored value, selected by sensor id.
///
/// Temperature readings are stored in Celsius and converted on the way
/// out; accelerometer readings get the configured scaling factor applied.
fn transform_value(sensor_id: &str, value: f64, display: &DisplayConfig) -> f64 {
    match sensor_id {
        TEMP_SENSOR_ID if display.temperature_unit == TemperatureUnit::Fahrenheit => {
            celsius_to_fahrenheit(value)
        }
        ACCEL_SENSOR_ID => value * display.accel_scale,
        _ => value,
    }
}

/// Display unit for a sensor's fields, if it has one.
fn unit_label(sensor_id: &str, display: &DisplayConfig) -> Option<&'static str> {
    match sensor_id {
        TEMP_SENSOR_ID => Some(display.temperature_unit.symbol()),
        ACCEL_SENSOR_ID => Some("m/s²"),
        PRESSURE_SENSOR_ID => Some("hPa"),
        _ => None,
    }
}

/// One time series per declared field, derived from a window-filtered
/// snapshot with display transforms applied.
///
/// Every reading carries all fields atomically, so the returned series
/// share length and timestamps; a chart can align them without
/// reconciliation.
#[must_use]
pub fn get_series(
    state: &SensorState,
    window: Option<Duration>,
    display: &DisplayConfig,
) -> Vec<FieldSeries> {
    let definition = state.definition();
    let snapshot = state.snapshot(window);

    definition
        .field_names
        .iter()
        .enumerate()
        .map(|(index, field)| FieldSeries {
            field: field.clone(),
            points: snapshot
                .iter()
                .map(|reading| {
                    let value = reading.values[index];
                    (
                        reading.timestamp,
                        transform_value(&definition.sensor_id, value, display),
                    )
                })
                .collect(),
        })
        .collect()
}

/// Latest value per field, formatted for display, in declared field order.
///
/// Values are rendered with two decimals and the sensor's display unit,
/// e.g. `"23.50 °C"`. Before the first reading arrives every field maps
/// to [`UNAVAILABLE`]; the presentation layer renders that instead of
/// blocking or erroring.
#[must_use]
pub fn get_latest_values(state: &SensorState, display: &DisplayConfig) -> Vec<(String, String)> {
    let definition = state.definition();
    let latest = state.latest();

    definition
        .field_names
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let formatted = match &latest {
                None => UNAVAILABLE.to_string(),
                Some(reading) => {
                    let value = transform_value(&definition.sensor_id, reading.values[index], display);
                    match unit_label(&definition.sensor_id, display) {
                        Some(unit) => format!("{value:.2} {unit}"),
                        None => format!("{value:.2}"),
                    }
                }
            };
            (field.clone(), formatted)
        })
        .collect()
}

/// Axis title for one field's chart, including the display unit.
#[must_use]
pub fn axis_title(state: &SensorState, field: &str, display: &DisplayConfig) -> String {
    let mut title = capitalize(field);
    if let Some(unit) = unit_label(&state.definition().sensor_id, display) {
        title.push_str(&format!(" ({unit})"));
    }
    title
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
