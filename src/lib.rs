//! # Sensor Bridge Library
//!
//! Live sensor telemetry ingestion over a serial link.
//!
//! This library owns the serial channel, reconstructs discrete sensor
//! readings from the byte stream, fans them out to per-sensor state
//! holders, and serves time-windowed snapshots to concurrent readers.
//! The dashboard/presentation layer sits on top of the [`query`] module
//! and is not part of this crate.

pub mod channel;
pub mod config;
pub mod error;
pub mod query;
pub mod sensor;
