use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::lines::{LineReader, DEFAULT_MAX_LINE_LEN};
use crate::traits::{LineSink, Transport};

/// Baud rate the pilot board firmware listens at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout; bounds how long `close` waits for the reader thread.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial port settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub max_line_len: usize,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Serial-port transport.
///
/// Opening the port spawns a reader thread that splits inbound bytes into
/// lines and forwards them to the session's [`LineSink`]. When the port
/// reports end of file or a hard read error, the thread sends a close event
/// and exits. Closing the transport stops the thread first, so a deliberate
/// close never produces a close event.
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
    reader: Option<ReaderHandle>,
}

struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: None,
            reader: None,
        }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Open {
            port: self.config.port.clone(),
            source,
        }
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, sink: LineSink) -> Result<()> {
        self.close();

        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .timeout(self.config.read_timeout)
            .open()
            .map_err(|err| self.open_error(err.into()))?;
        let reader_port = port
            .try_clone()
            .map_err(|err| self.open_error(err.into()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let session = sink.session();
        let thread = thread::Builder::new()
            .name(format!("pilotlink-rx-{session}"))
            .spawn({
                let stop = Arc::clone(&stop);
                let max_line_len = self.config.max_line_len;
                move || read_loop(reader_port, sink, stop, max_line_len)
            })?;

        debug!(
            port = %self.config.port,
            baud = self.config.baud_rate,
            session,
            "serial port opened"
        );

        self.port = Some(port);
        self.reader = Some(ReaderHandle { stop, thread });
        Ok(())
    }

    fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.stop.store(true, Ordering::Release);
            if reader.thread.join().is_err() {
                warn!(port = %self.config.port, "serial reader thread panicked");
            }
        }
        if self.port.take().is_some() {
            debug!(port = %self.config.port, "serial port closed");
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.port
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_loop(port: Box<dyn SerialPort>, sink: LineSink, stop: Arc<AtomicBool>, max_line_len: usize) {
    let mut reader = LineReader::with_max_line_len(port, max_line_len);

    while !stop.load(Ordering::Acquire) {
        match reader.read_line() {
            Ok(line) => {
                if !sink.line(line) {
                    return;
                }
            }
            Err(TransportError::Io(err))
                if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
            {
                continue;
            }
            Err(TransportError::LineTooLong { len, max }) => {
                warn!(len, max, "discarding oversized inbound line");
            }
            Err(err) => {
                if !stop.load(Ordering::Acquire) {
                    warn!(error = %err, session = sink.session(), "serial read failed");
                    sink.closed();
                }
                return;
            }
        }
    }
}
