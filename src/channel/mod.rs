//! # Communication Channel Module
//!
//! Handles delivery of sensor frames from a communication medium to
//! registered per-sensor handlers.
//!
//! This module handles:
//! - The [`Channel`] trait implemented by each transport variant
//! - Frame parsing (routing key / payload split)
//! - The routing-key → handler registry
//! - The serial transport with reconnect-and-backoff recovery

pub mod registry;
pub mod serial;
pub mod transport;

use std::sync::Arc;

/// Handler invoked with the comma-split payload tokens of one frame.
///
/// Handlers run on the channel's read task and must not block.
pub type PayloadHandler = Arc<dyn Fn(&[&str]) + Send + Sync>;

/// Abstraction over a communication medium delivering frames to
/// registered handlers.
///
/// Implemented by [`serial::SerialChannel`]; an alternate pub/sub
/// transport plugs in behind the same contract.
pub trait Channel: Send + Sync {
    /// Register `handler` for frames carrying `sensor_id` as routing key.
    ///
    /// Registering a second handler for the same key replaces the first.
    /// Safe to call while the read loop is dispatching.
    fn register_callback(&self, sensor_id: &str, handler: PayloadHandler);

    /// Remove the handler for `sensor_id`, if any. Frames for the key are
    /// dropped from then on.
    fn deregister_callback(&self, sensor_id: &str);

    /// Stop the read loop and release the underlying connection.
    /// Idempotent.
    fn close(&self);
}

/// Split one wire frame into its routing key and payload.
///
/// The frame format is `<routing_key>:<comma-separated field tokens>`;
/// the split happens on the *first* `:` and both sides are trimmed.
/// A frame without a delimiter yields `None` and is dropped by the caller.
///
/// # Examples
///
/// ```
/// use sensor_bridge::channel::parse_message;
///
/// assert_eq!(
///     parse_message("ACCEL_SENSOR:0.981,0.003,9.751"),
///     Some(("ACCEL_SENSOR", "0.981,0.003,9.751"))
/// );
/// assert_eq!(parse_message("garbage without delimiter"), None);
/// ```
pub fn parse_message(frame: &str) -> Option<(&str, &str)> {
    let (key, payload) = frame.split_once(':')?;
    Some((key.trim(), payload.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_splits_on_first_delimiter() {
        let (key, payload) = parse_message("TEMP_SENSOR:23.5").unwrap();
        assert_eq!(key, "TEMP_SENSOR");
        assert_eq!(payload, "23.5");

        // Only the first ':' is the delimiter; the rest stays in the payload
        let (key, payload) = parse_message("GPS:12:34:56").unwrap();
        assert_eq!(key, "GPS");
        assert_eq!(payload, "12:34:56");
    }

    #[test]
    fn test_parse_message_trims_whitespace() {
        let (key, payload) = parse_message("  TEMP_SENSOR : 23.5 ").unwrap();
        assert_eq!(key, "TEMP_SENSOR");
        assert_eq!(payload, "23.5");
    }

    #[test]
    fn test_parse_message_without_delimiter() {
        assert_eq!(parse_message("no delimiter here"), None);
        assert_eq!(parse_message(""), None);
    }

    #[test]
    fn test_parse_message_empty_sides() {
        // Degenerate but well-formed frames still split
        assert_eq!(parse_message(":1.0"), Some(("", "1.0")));
        assert_eq!(parse_message("TEMP_SENSOR:"), Some(("TEMP_SENSOR", "")));
    }
}
