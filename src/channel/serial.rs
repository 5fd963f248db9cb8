//! # Serial Channel
//!
//! Owns the serial connection and the background read loop.
//!
//! This module handles:
//! - Opening the serial port from configuration
//! - Reading newline-delimited frames
//! - Splitting frames into routing key and payload and dispatching to
//!   registered handlers
//! - Error recovery: a broken connection is discarded and reopened with a
//!   fixed backoff, forever, until the channel is closed

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::registry::CallbackRegistry;
use super::transport::{FrameTransport, SerialTransport};
use super::{parse_message, Channel, PayloadHandler};
use crate::config::SerialConfig;
use crate::error::Result;

/// Timing parameters of the read loop
#[derive(Debug, Clone)]
pub(crate) struct LoopSettings {
    /// Upper bound on one blocking read; also bounds how long `close()`
    /// takes to be observed
    pub read_timeout: Duration,
    /// Fixed delay between reconnect attempts
    pub reconnect_interval: Duration,
}

impl From<&SerialConfig> for LoopSettings {
    fn from(config: &SerialConfig) -> Self {
        Self {
            read_timeout: Duration::from_millis(config.timeout_ms),
            reconnect_interval: Duration::from_millis(config.reconnect_interval_ms),
        }
    }
}

/// Serial transport channel.
///
/// `open` spawns the background read task immediately; handlers may be
/// registered before or after the port actually connects. Frames arriving
/// for keys with no registered handler are dropped.
///
/// # Examples
///
/// ```no_run
/// use sensor_bridge::channel::serial::SerialChannel;
/// use sensor_bridge::channel::Channel;
/// use sensor_bridge::config::SerialConfig;
///
/// let channel = SerialChannel::open(SerialConfig::default());
/// // ... register sensor callbacks, run for a while ...
/// channel.close();
/// ```
pub struct SerialChannel {
    registry: CallbackRegistry,
    shutdown: watch::Sender<bool>,
}

impl SerialChannel {
    /// Open a serial channel and start its background read loop.
    ///
    /// The port itself is opened inside the loop: if the device is absent
    /// the loop keeps retrying with the configured backoff until it
    /// appears or the channel is closed. Opening therefore never fails.
    #[must_use]
    pub fn open(config: SerialConfig) -> Self {
        let registry = CallbackRegistry::new();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let settings = LoopSettings::from(&config);

        let loop_registry = registry.clone();
        tokio::spawn(async move {
            run_loop(
                move || SerialTransport::open(&config),
                settings,
                loop_registry,
                shutdown_rx,
            )
            .await;
        });

        Self { registry, shutdown }
    }
}

impl Channel for SerialChannel {
    fn register_callback(&self, sensor_id: &str, handler: PayloadHandler) {
        self.registry.register(sensor_id, handler);
    }

    fn deregister_callback(&self, sensor_id: &str) {
        self.registry.deregister(sensor_id);
    }

    fn close(&self) {
        // Receiver may already be gone if the loop exited; nothing to do then
        let _ = self.shutdown.send(true);
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// The channel's read loop, generic over the transport so tests can
/// inject scripted connections.
///
/// Runs until the shutdown signal flips to `true`:
/// 1. Connect; on failure, sleep one backoff interval and retry forever.
/// 2. Read frames and dispatch them.
/// 3. On read error or end of stream, drop the connection and go to 1.
///
/// The in-flight frame of a broken read is lost, never retried.
pub(crate) async fn run_loop<T, C>(
    mut connect: C,
    settings: LoopSettings,
    registry: CallbackRegistry,
    mut shutdown: watch::Receiver<bool>,
) where
    T: FrameTransport,
    C: FnMut() -> Result<T>,
{
    'reconnect: loop {
        if *shutdown.borrow() {
            break;
        }

        let mut transport = match connect() {
            Ok(transport) => {
                info!("Transport connected");
                transport
            }
            Err(e) => {
                warn!(
                    "Failed to connect: {}; retrying in {:?}",
                    e, settings.reconnect_interval
                );
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = sleep(settings.reconnect_interval) => continue,
                }
            }
        };

        loop {
            let read = tokio::select! {
                _ = shutdown.changed() => break 'reconnect,
                read = timeout(settings.read_timeout, transport.read_frame()) => read,
            };

            match read {
                // Read timeout: idle line, poll the shutdown flag again
                Err(_elapsed) => {
                    if *shutdown.borrow() {
                        break 'reconnect;
                    }
                }
                Ok(Ok(Some(frame))) => dispatch_frame(&registry, &frame),
                Ok(Ok(None)) => {
                    warn!("Transport closed by peer; reconnecting");
                    break;
                }
                Ok(Err(e)) => {
                    warn!("Transport read failed: {}; reconnecting", e);
                    break;
                }
            }
        }
        // Connection dropped here; loop back and reconnect immediately.
        // Backoff only separates failed open attempts.
    }

    info!("Channel read loop stopped");
}

/// Parse one frame and hand its payload tokens to the registered handler.
///
/// Empty frames, frames without a delimiter, and frames for unregistered
/// keys are dropped without invoking anything.
fn dispatch_frame(registry: &CallbackRegistry, frame: &str) {
    if frame.is_empty() {
        return;
    }

    let Some((sensor_id, payload)) = parse_message(frame) else {
        debug!("Dropping frame without delimiter: {:?}", frame);
        return;
    };

    let tokens: Vec<&str> = payload.split(',').map(str::trim).collect();
    if !registry.dispatch(sensor_id, &tokens) {
        debug!("No handler registered for {:?}; frame dropped", sensor_id);
    }
}
