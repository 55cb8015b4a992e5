//! Serial command and telemetry link to a differential-drive pilot board.
//!
//! pilotlink keeps a serial connection to the board alive, speaks its
//! newline-delimited JSON protocol, and tracks what the board reports.
//!
//! # Crate Structure
//!
//! - [`transport`]: Line-oriented byte transport (serial port behind the `serial` feature)
//! - [`frame`]: Line codec and inbound message classification
//! - [`link`]: Connection management, commands, device state and the event loop
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::{Duration, Instant};
//!
//! use pilotlink::link::{DriverOptions, Geometry, Link, LinkEvent};
//! use pilotlink::transport::{SerialConfig, SerialTransport};
//!
//! let transport = SerialTransport::new(SerialConfig::new("/dev/ttyACM0"));
//! let options = DriverOptions::new(Geometry::new(4900.0, 450.0));
//! let mut link = Link::new(transport, &options, Vec::<LinkEvent>::new())?;
//!
//! link.start(Instant::now());
//! loop {
//!     link.step(Duration::from_millis(100));
//!     for event in link.events_mut().drain(..) {
//!         println!("{}", event.name());
//!     }
//! }
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

/// Re-export transport types.
pub mod transport {
    pub use pilotlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pilotlink_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use pilotlink_link::*;
}
