//! # Sensor Module
//!
//! Per-sensor state: typed readings, the append-only reading log, and
//! point-in-time snapshots for concurrent readers.
//!
//! This module handles:
//! - Converting raw payload tokens into typed readings (all-or-nothing)
//! - Appending readings in arrival order under a per-sensor lock
//! - Serving time-windowed snapshot copies that are safe to hold while
//!   the read loop keeps appending

pub mod catalog;

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, SensorBridgeError};

/// Static description of one physical sensor.
///
/// `sensor_id` doubles as the routing key on the wire; `field_names`
/// order defines the position of each token in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDefinition {
    pub sensor_id: String,
    pub display_name: String,
    pub field_names: Vec<String>,
}

impl SensorDefinition {
    /// Creates a definition from string literals.
    #[must_use]
    pub fn new(sensor_id: &str, display_name: &str, field_names: &[&str]) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            display_name: display_name.to_string(),
            field_names: field_names.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// One timestamped, fully-parsed set of a sensor's field values.
///
/// `values` is positionally aligned with the owning definition's
/// `field_names` and every value is finite. Readings are immutable once
/// constructed; a snapshot hands out clones.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<f64>,
}

impl Reading {
    /// Value at field position `index`, if declared.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }
}

/// State holder for one sensor: definition plus the growing reading log.
///
/// Appends (from the channel's read task) and snapshot reads (from any
/// number of presentation pollers) are serialized by one internal lock,
/// so a snapshot never observes a torn append.
///
/// # Examples
///
/// ```
/// use sensor_bridge::sensor::{SensorDefinition, SensorState};
///
/// let state = SensorState::new(
///     SensorDefinition::new("TEMP_SENSOR", "Temperature Sensor", &["temperature"]),
///     None,
/// );
/// state.handle_payload(&["23.5"])?;
/// assert_eq!(state.latest().unwrap().values, vec![23.5]);
/// # Ok::<(), sensor_bridge::error::SensorBridgeError>(())
/// ```
#[derive(Debug)]
pub struct SensorState {
    definition: SensorDefinition,
    log: Mutex<VecDeque<Reading>>,
    /// Ring capacity; `None` accumulates for the process lifetime
    capacity: Option<usize>,
}

impl SensorState {
    /// Creates an empty holder for `definition`.
    ///
    /// With `capacity = Some(n)` the log becomes a ring that evicts its
    /// oldest reading once `n` are stored.
    #[must_use]
    pub fn new(definition: SensorDefinition, capacity: Option<usize>) -> Self {
        Self {
            definition,
            log: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// The immutable sensor definition.
    #[must_use]
    pub fn definition(&self) -> &SensorDefinition {
        &self.definition
    }

    /// Convert one frame's payload tokens into a reading and append it.
    ///
    /// Tokens are zipped positionally against the declared field names.
    /// The reading is stored all-or-nothing: a token count mismatch or
    /// any token that does not parse as a finite float rejects the whole
    /// frame and leaves the log untouched.
    ///
    /// The timestamp is assigned at arrival, so under normal operation
    /// log order and timestamp order coincide.
    ///
    /// # Errors
    ///
    /// Returns [`SensorBridgeError::InvalidReading`] describing the
    /// rejected tokens; the caller is expected to log it.
    pub fn handle_payload(&self, tokens: &[&str]) -> Result<()> {
        if tokens.len() != self.definition.field_names.len() {
            return Err(self.invalid(format!(
                "expected {} tokens, got {} ({:?})",
                self.definition.field_names.len(),
                tokens.len(),
                tokens
            )));
        }

        // Parse everything before touching the log
        let mut values = Vec::with_capacity(tokens.len());
        for (field, token) in self.definition.field_names.iter().zip(tokens) {
            let value: f64 = token
                .parse()
                .map_err(|_| self.invalid(format!("field {field:?}: {token:?} is not numeric")))?;
            if !value.is_finite() {
                return Err(self.invalid(format!("field {field:?}: {token:?} is not finite")));
            }
            values.push(value);
        }

        let reading = Reading {
            timestamp: Utc::now(),
            values,
        };

        let mut log = self.log.lock().expect("sensor log lock poisoned");
        if let Some(capacity) = self.capacity {
            while log.len() >= capacity {
                log.pop_front();
            }
        }
        log.push_back(reading);
        Ok(())
    }

    /// A point-in-time copy of the reading log, oldest first.
    ///
    /// With a window, only readings whose timestamp falls within
    /// `[now - window, now]` are returned; since the log is ordered by
    /// arrival, that is a suffix of the full log. The returned vector is
    /// detached from the holder and never mutated by later appends.
    #[must_use]
    pub fn snapshot(&self, window: Option<Duration>) -> Vec<Reading> {
        let log = self.log.lock().expect("sensor log lock poisoned");
        match window {
            None => log.iter().cloned().collect(),
            Some(window) => {
                let cutoff = Utc::now() - window;
                log.iter()
                    .filter(|r| r.timestamp >= cutoff)
                    .cloned()
                    .collect()
            }
        }
    }

    /// The most recently appended reading, or `None` before the first
    /// frame arrives.
    #[must_use]
    pub fn latest(&self) -> Option<Reading> {
        let log = self.log.lock().expect("sensor log lock poisoned");
        log.back().cloned()
    }

    /// Number of stored readings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().expect("sensor log lock poisoned").len()
    }

    /// Whether no readings have been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn invalid(&self, reason: String) -> SensorBridgeError {
        SensorBridgeError::InvalidReading {
            sensor_id: self.definition.sensor_id.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_state() -> SensorState {
        SensorState::new(
            SensorDefinition::new("TEMP_SENSOR", "Temperature Sensor", &["temperature"]),
            None,
        )
    }

    fn accel_state() -> SensorState {
        SensorState::new(
            SensorDefinition::new("ACCEL_SENSOR", "Accelerometer Sensor", &["x", "y", "z"]),
            None,
        )
    }

    #[test]
    fn test_handle_payload_appends_typed_reading() {
        let state = temp_state();
        state.handle_payload(&["23.5"]).unwrap();

        let latest = state.latest().unwrap();
        assert_eq!(latest.values, vec![23.5]);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_multi_field_payload_preserves_order() {
        let state = accel_state();
        state.handle_payload(&["0.981", "0.003", "9.751"]).unwrap();

        let latest = state.latest().unwrap();
        assert_eq!(latest.values, vec![0.981, 0.003, 9.751]);
        assert_eq!(latest.value(2), Some(9.751));
        assert_eq!(latest.value(3), None);
    }

    #[test]
    fn test_non_numeric_token_rejects_whole_reading() {
        let state = accel_state();
        state.handle_payload(&["0.1", "0.2", "0.3"]).unwrap();

        let err = state.handle_payload(&["0.4", "abc", "0.6"]).unwrap_err();
        assert!(matches!(err, SensorBridgeError::InvalidReading { .. }));

        // Log untouched; latest is still the prior reading
        assert_eq!(state.len(), 1);
        assert_eq!(state.latest().unwrap().values, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_rejection_on_empty_log_leaves_it_empty() {
        let state = temp_state();
        assert!(state.handle_payload(&["abc"]).is_err());
        assert!(state.is_empty());
        assert!(state.latest().is_none());
    }

    #[test]
    fn test_token_count_mismatch_rejected() {
        let state = accel_state();
        assert!(state.handle_payload(&["1.0", "2.0"]).is_err());
        assert!(state.handle_payload(&["1.0", "2.0", "3.0", "4.0"]).is_err());
        assert!(state.is_empty());
    }

    #[test]
    fn test_non_finite_tokens_rejected() {
        let state = temp_state();
        assert!(state.handle_payload(&["NaN"]).is_err());
        assert!(state.handle_payload(&["inf"]).is_err());
        assert!(state.handle_payload(&["-inf"]).is_err());
        assert!(state.is_empty());
    }

    #[test]
    fn test_snapshot_timestamps_non_decreasing() {
        let state = temp_state();
        for i in 0..50 {
            let token = format!("{i}.0");
            state.handle_payload(&[token.as_str()]).unwrap();
        }

        let snapshot = state.snapshot(None);
        assert_eq!(snapshot.len(), 50);
        for pair in snapshot.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        assert_eq!(snapshot[0].values, vec![0.0]);
        assert_eq!(snapshot[49].values, vec![49.0]);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let state = temp_state();
        state.handle_payload(&["1.0"]).unwrap();

        let snapshot = state.snapshot(None);
        state.handle_payload(&["2.0"]).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_window_filtering_returns_recent_suffix() {
        let state = temp_state();
        state.handle_payload(&["1.0"]).unwrap();
        state.handle_payload(&["2.0"]).unwrap();

        // Everything just arrived, so a generous window keeps it all
        let recent = state.snapshot(Some(Duration::seconds(60)));
        assert_eq!(recent.len(), 2);

        let cutoff = Utc::now() - Duration::seconds(60);
        assert!(recent.iter().all(|r| r.timestamp >= cutoff));

        // A window entirely in the past filters everything out
        let stale = state.snapshot(Some(Duration::zero()));
        assert!(stale.len() <= 2);
        let full = state.snapshot(None);
        // Window result is a suffix of the full log
        assert_eq!(recent.as_slice(), &full[full.len() - recent.len()..]);
    }

    #[test]
    fn test_snapshot_on_empty_holder() {
        let state = temp_state();
        assert!(state.snapshot(None).is_empty());
        assert!(state.snapshot(Some(Duration::seconds(10))).is_empty());
        assert!(state.latest().is_none());
    }

    #[test]
    fn test_bounded_capacity_evicts_oldest() {
        let state = SensorState::new(
            SensorDefinition::new("TEMP_SENSOR", "Temperature Sensor", &["temperature"]),
            Some(3),
        );
        for i in 0..5 {
            let token = format!("{i}.0");
            state.handle_payload(&[token.as_str()]).unwrap();
        }

        let snapshot = state.snapshot(None);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].values, vec![2.0]);
        assert_eq!(snapshot[2].values, vec![4.0]);
    }

    #[test]
    fn test_concurrent_appends_and_snapshots() {
        let state = Arc::new(accel_state());

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        state.handle_payload(&["0.1", "0.2", "0.3"]).unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        for reading in state.snapshot(None) {
                            // A reading is published whole or not at all
                            assert_eq!(reading.values.len(), 3);
                        }
                    }
                })
            })
            .collect();

        for t in writers {
            t.join().unwrap();
        }
        for t in readers {
            t.join().unwrap();
        }
        assert_eq!(state.len(), 2000);
    }
}
