use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::error::{Result, TransportError};

/// Default maximum inbound line length: 4 KiB.
pub const DEFAULT_MAX_LINE_LEN: usize = 4 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Splits any `Read` stream into newline-terminated lines.
///
/// Handles partial reads internally. Bytes that arrive without a terminator
/// stay buffered across calls, including across read timeouts.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    max_line_len: usize,
    /// Set after an oversized line until its terminator has been skipped.
    discarding: bool,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with the default line length limit.
    pub fn new(inner: T) -> Self {
        Self::with_max_line_len(inner, DEFAULT_MAX_LINE_LEN)
    }

    /// Create a new line reader with an explicit line length limit.
    pub fn with_max_line_len(inner: T, max_line_len: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_line_len,
            discarding: false,
        }
    }

    /// Read the next complete line (blocking).
    ///
    /// The terminator and a trailing `\r` are stripped. Invalid UTF-8 is
    /// replaced rather than rejected. Returns `Err(TransportError::Closed)`
    /// at end of file; an unterminated tail is discarded.
    ///
    /// A line longer than the limit is reported once with
    /// `Err(TransportError::LineTooLong)`; the rest of it, up to and including
    /// its terminator, is skipped.
    pub fn read_line(&mut self) -> Result<String> {
        loop {
            if self.discarding {
                match self.buf.iter().position(|&b| b == b'\n') {
                    Some(end) => {
                        let _ = self.buf.split_to(end + 1);
                        self.discarding = false;
                    }
                    None => self.buf.clear(),
                }
            }

            if !self.discarding {
                if let Some(end) = self.buf.iter().position(|&b| b == b'\n') {
                    if end > self.max_line_len {
                        let _ = self.buf.split_to(end + 1);
                        return Err(TransportError::LineTooLong {
                            len: end,
                            max: self.max_line_len,
                        });
                    }
                    if let Some(line) = split_line(&mut self.buf) {
                        return Ok(line);
                    }
                }
            }

            if self.buf.len() > self.max_line_len {
                let len = self.buf.len();
                self.buf.clear();
                self.discarding = true;
                return Err(TransportError::LineTooLong {
                    len,
                    max: self.max_line_len,
                });
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            };

            if read == 0 {
                return Err(TransportError::Closed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Take one complete line off the front of `buf`, if there is one.
pub fn split_line(buf: &mut BytesMut) -> Option<String> {
    let end = buf.iter().position(|&b| b == b'\n')?;
    let raw = buf.split_to(end + 1);
    let mut line = &raw[..end];
    if let Some(stripped) = line.strip_suffix(b"\r") {
        line = stripped;
    }
    Some(String::from_utf8_lossy(line).into_owned())
}
