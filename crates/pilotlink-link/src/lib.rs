//! Link protocol layer between a supervisory process and the pilot board.
//!
//! - [`ConnectionManager`] owns the transport: open, retry, settle, close.
//! - [`Driver`] is the protocol state machine: it classifies inbound lines,
//!   tracks [`DeviceState`], runs the one-shot bootstrap configuration and
//!   builds validated [`Command`]s.
//! - [`Link`] composes the two and runs the single-threaded event loop.
//!
//! Nothing in this crate blocks except [`Link::step`], which waits for the
//! next inbound line or timer deadline. All timers take an explicit `now`.

pub mod command;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod events;
pub mod link;
pub mod options;
pub mod pose;
pub mod quantize;
pub mod telemetry;

pub use command::{Command, Configuration, Motion, PoseReset, Rotation};
pub use config::LinkConfig;
pub use connection::{ConnectionEvent, ConnectionManager, Incoming};
pub use driver::{DeviceConfig, DeviceState, Driver, Status};
pub use error::{LinkError, Result};
pub use events::{EventSink, FnSink, LinkEvent};
pub use link::Link;
pub use options::{AhrsCalibration, DriverOptions, Geometry};
pub use pose::Pose;
pub use quantize::quantize;
pub use telemetry::{TelemetryLog, TelemetryRecord};
