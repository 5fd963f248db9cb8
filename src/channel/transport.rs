//! Trait abstraction for frame transports to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::config::SerialConfig;
use crate::error::{Result, SensorBridgeError};

/// Trait for reading newline-delimited frames off a connection
#[async_trait]
pub trait FrameTransport: Send {
    /// Read the next frame, without its line terminator.
    ///
    /// Must be cancel-safe: the read loop wraps calls in a read timeout,
    /// so dropping an in-progress call has to keep any partially received
    /// bytes buffered for the next call rather than discard them.
    ///
    /// Returns `Ok(None)` on end of stream; the caller treats that as a
    /// disconnect. An `Err` means the connection is broken and must be
    /// discarded.
    async fn read_frame(&mut self) -> io::Result<Option<String>>;
}

/// Newline-delimited frames over any byte stream.
///
/// Partial-line state lives in the transport itself: a frame whose bytes
/// straddle a cancelled read is completed by the next call, not lost.
pub struct LineTransport<R> {
    reader: BufReader<R>,
    line: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineTransport<R> {
    /// Wraps a byte stream in a buffered frame reader.
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            line: Vec::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameTransport for LineTransport<R> {
    async fn read_frame(&mut self) -> io::Result<Option<String>> {
        // read_until appends across cancelled calls; `line` is cleared
        // only once a complete frame goes out
        let n = self.reader.read_until(b'\n', &mut self.line).await?;
        if n == 0 {
            // End of stream; whatever partial frame is buffered goes
            // down with the connection
            self.line.clear();
            return Ok(None);
        }
        if self.line.last() != Some(&b'\n') {
            // read_until also returns at EOF; an unterminated tail is an
            // in-flight frame cut short, not a frame
            self.line.clear();
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&self.line);
        let frame = text.trim_end_matches(['\r', '\n']).to_string();
        self.line.clear();
        Ok(Some(frame))
    }
}

/// Frame transport over a `tokio_serial` port
pub type SerialTransport = LineTransport<tokio_serial::SerialStream>;

impl LineTransport<tokio_serial::SerialStream> {
    /// Open the serial port named in `config` with 8N1 framing.
    ///
    /// # Errors
    ///
    /// Returns [`SensorBridgeError::Serial`] if the port cannot be opened.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                SensorBridgeError::Serial(format!("Failed to open {}: {}", config.port, e))
            })?;

        Ok(Self::new(port))
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One scripted outcome of a `read_frame` call
    pub enum Step {
        Frame(&'static str),
        Error(io::ErrorKind),
        Eof,
    }

    /// Mock transport that replays a script of frames and failures,
    /// then blocks forever (like an idle line).
    pub struct ScriptedTransport {
        steps: Arc<Mutex<VecDeque<Step>>>,
    }

    impl ScriptedTransport {
        pub fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Arc::new(Mutex::new(steps.into())),
            }
        }

        pub fn frames(frames: &[&'static str]) -> Self {
            Self::new(frames.iter().copied().map(Step::Frame).collect())
        }
    }

    #[async_trait]
    impl FrameTransport for ScriptedTransport {
        async fn read_frame(&mut self) -> io::Result<Option<String>> {
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Frame(frame)) => Ok(Some(frame.to_string())),
                Some(Step::Error(kind)) => Err(io::Error::new(kind, "scripted transport error")),
                Some(Step::Eof) => Ok(None),
                None => std::future::pending().await,
            }
        }
    }
}
