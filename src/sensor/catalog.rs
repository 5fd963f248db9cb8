//! Static sensor catalog and discovery.
//!
//! The set of known sensors is a compile-time table rather than anything
//! discovered at runtime; adding a sensor means adding a definition here.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use super::{SensorDefinition, SensorState};
use crate::channel::Channel;
use crate::error::{Result, SensorBridgeError};

/// Routing key of the accelerometer sensor
pub const ACCEL_SENSOR_ID: &str = "ACCEL_SENSOR";
/// Routing key of the temperature sensor
pub const TEMP_SENSOR_ID: &str = "TEMP_SENSOR";
/// Routing key of the pressure sensor
pub const PRESSURE_SENSOR_ID: &str = "PRESSURE_SENSOR";

/// The built-in sensor definitions.
#[must_use]
pub fn builtin_definitions() -> Vec<SensorDefinition> {
    vec![
        SensorDefinition::new(ACCEL_SENSOR_ID, "Accelerometer Sensor", &["x", "y", "z"]),
        SensorDefinition::new(TEMP_SENSOR_ID, "Temperature Sensor", &["temperature"]),
        SensorDefinition::new(PRESSURE_SENSOR_ID, "Pressure Sensor", &["pressure"]),
    ]
}

/// Build one state holder per definition and bind each to `channel`.
///
/// Every holder self-registers its payload handler under its sensor id.
/// Payloads the holder rejects are logged and dropped inside the handler,
/// never propagated into the read loop.
///
/// # Arguments
///
/// * `channel` - Shared transport channel the sensors listen on
/// * `definitions` - Sensor set, usually [`builtin_definitions`]
/// * `capacity` - Optional per-sensor ring capacity for the reading log
///
/// # Errors
///
/// Returns [`SensorBridgeError::DuplicateSensor`] when two definitions
/// share a sensor id; this is a configuration error surfaced at startup,
/// never silently merged.
pub fn discover(
    channel: &dyn Channel,
    definitions: Vec<SensorDefinition>,
    capacity: Option<usize>,
) -> Result<Vec<Arc<SensorState>>> {
    let mut seen = HashSet::new();
    for definition in &definitions {
        if !seen.insert(definition.sensor_id.clone()) {
            return Err(SensorBridgeError::DuplicateSensor(
                definition.sensor_id.clone(),
            ));
        }
    }

    let mut sensors = Vec::with_capacity(definitions.len());
    for definition in definitions {
        let state = Arc::new(SensorState::new(definition, capacity));

        let handler_state = state.clone();
        let handler: crate::channel::PayloadHandler = Arc::new(move |tokens: &[&str]| {
            if let Err(e) = handler_state.handle_payload(tokens) {
                warn!("Discarding reading: {}", e);
            }
        });
        channel.register_callback(&state.definition().sensor_id, handler);

        info!(
            "Registered {} ({}) with fields {:?}",
            state.definition().display_name,
            state.definition().sensor_id,
            state.definition().field_names
        );
        sensors.push(state);
    }

    Ok(sensors)
}

/// Deregister every sensor's handler from `channel`.
///
/// Called at teardown; frames still in flight for these keys are dropped
/// by the channel afterwards.
pub fn deregister_all(channel: &dyn Channel, sensors: &[Arc<SensorState>]) {
    for sensor in sensors {
        channel.deregister_callback(&sensor.definition().sensor_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::registry::CallbackRegistry;
    use crate::channel::PayloadHandler;

    /// Channel stub backed by a bare registry; no transport behind it.
    #[derive(Default)]
    struct StubChannel {
        registry: CallbackRegistry,
    }

    impl Channel for StubChannel {
        fn register_callback(&self, sensor_id: &str, handler: PayloadHandler) {
            self.registry.register(sensor_id, handler);
        }

        fn deregister_callback(&self, sensor_id: &str) {
            self.registry.deregister(sensor_id);
        }

        fn close(&self) {}
    }

    #[test]
    fn test_builtin_definitions() {
        let definitions = builtin_definitions();
        assert_eq!(definitions.len(), 3);

        let accel = &definitions[0];
        assert_eq!(accel.sensor_id, ACCEL_SENSOR_ID);
        assert_eq!(accel.field_names, vec!["x", "y", "z"]);

        let temp = &definitions[1];
        assert_eq!(temp.display_name, "Temperature Sensor");
        assert_eq!(temp.field_names, vec!["temperature"]);
    }

    #[test]
    fn test_discover_registers_each_sensor() {
        let channel = StubChannel::default();
        let sensors = discover(&channel, builtin_definitions(), None).unwrap();

        assert_eq!(sensors.len(), 3);
        assert!(channel.registry.is_registered(ACCEL_SENSOR_ID));
        assert!(channel.registry.is_registered(TEMP_SENSOR_ID));
        assert!(channel.registry.is_registered(PRESSURE_SENSOR_ID));
    }

    #[test]
    fn test_dispatched_payload_lands_in_holder() {
        let channel = StubChannel::default();
        let sensors = discover(&channel, builtin_definitions(), None).unwrap();

        assert!(channel.registry.dispatch(TEMP_SENSOR_ID, &["23.5"]));

        let temp = sensors
            .iter()
            .find(|s| s.definition().sensor_id == TEMP_SENSOR_ID)
            .unwrap();
        assert_eq!(temp.latest().unwrap().values, vec![23.5]);
    }

    #[test]
    fn test_rejected_payload_is_swallowed_by_handler() {
        let channel = StubChannel::default();
        let sensors = discover(&channel, builtin_definitions(), None).unwrap();

        // Handler logs and drops; dispatch itself succeeds
        assert!(channel.registry.dispatch(TEMP_SENSOR_ID, &["abc"]));

        let temp = sensors
            .iter()
            .find(|s| s.definition().sensor_id == TEMP_SENSOR_ID)
            .unwrap();
        assert!(temp.is_empty());
    }

    #[test]
    fn test_duplicate_sensor_id_is_configuration_error() {
        let channel = StubChannel::default();
        let definitions = vec![
            SensorDefinition::new("TEMP_SENSOR", "Temperature Sensor", &["temperature"]),
            SensorDefinition::new("TEMP_SENSOR", "Another Temperature", &["t"]),
        ];

        let err = discover(&channel, definitions, None).unwrap_err();
        match err {
            SensorBridgeError::DuplicateSensor(id) => assert_eq!(id, "TEMP_SENSOR"),
            other => panic!("Expected DuplicateSensor, got: {:?}", other),
        }
        // Nothing is half-registered after the failure
        assert!(!channel.registry.is_registered("TEMP_SENSOR"));
    }

    #[test]
    fn test_deregister_all_removes_handlers() {
        let channel = StubChannel::default();
        let sensors = discover(&channel, builtin_definitions(), None).unwrap();

        deregister_all(&channel, &sensors);
        assert!(channel.registry.is_empty());
        assert!(!channel.registry.dispatch(TEMP_SENSOR_ID, &["23.5"]));
    }

    #[test]
    fn test_discover_applies_capacity() {
        let channel = StubChannel::default();
        let sensors = discover(&channel, builtin_definitions(), Some(2)).unwrap();

        for _ in 0..4 {
            channel.registry.dispatch(TEMP_SENSOR_ID, &["1.0"]);
        }
        let temp = sensors
            .iter()
            .find(|s| s.definition().sensor_id == TEMP_SENSOR_ID)
            .unwrap();
        assert_eq!(temp.len(), 2);
    }
}
