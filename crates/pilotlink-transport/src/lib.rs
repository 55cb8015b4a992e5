//! Line-oriented byte transport abstraction.
//!
//! This is the lowest layer of pilotlink. A [`Transport`] can be opened,
//! written to and closed; while open it delivers inbound bytes, already split
//! into lines, to a [`LineSink`]. Every open gets its own session number so
//! that events from a stale connection can be told apart from live ones.
//!
//! - [`LineReader`] splits any `Read` stream into lines.
//! - [`SerialTransport`] drives a real serial port (behind the `serial` feature).

pub mod error;
pub mod lines;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use lines::{LineReader, DEFAULT_MAX_LINE_LEN};
pub use traits::{Inbound, LineSink, Transport, TransportEvent};

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialTransport, DEFAULT_BAUD_RATE};
