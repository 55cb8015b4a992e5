use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use pilotlink_frame::encode_line;
use pilotlink_transport::{Inbound, Transport};
use tracing::{debug, warn};

use crate::command::{Command, Configuration, Motion, PoseReset, Rotation};
use crate::config::LinkConfig;
use crate::connection::{ConnectionEvent, ConnectionManager, Incoming};
use crate::driver::{DeviceState, Driver};
use crate::error::Result;
use crate::events::EventSink;
use crate::options::{AhrsCalibration, DriverOptions, Geometry};

/// A [`ConnectionManager`] wired to a [`Driver`].
///
/// Inbound lines from the transport are fed to the driver in arrival order,
/// and commands the driver produces go out through the manager. Everything
/// runs on the caller's thread: drive the link with [`step`](Self::step), or
/// feed it yourself with [`handle_inbound`](Self::handle_inbound) and
/// [`poll`](Self::poll).
pub struct Link<T, S> {
    manager: ConnectionManager<T>,
    driver: Driver<S>,
    inbound: Receiver<Inbound>,
    buf: BytesMut,
}

impl<T: Transport, S: EventSink> Link<T, S> {
    /// Build a link with default timing.
    ///
    /// Fails if the driver options are invalid; nothing is opened.
    pub fn new(transport: T, options: &DriverOptions, sink: S) -> Result<Self> {
        Self::with_config(transport, options, sink, LinkConfig::default())
    }

    pub fn with_config(
        transport: T,
        options: &DriverOptions,
        sink: S,
        config: LinkConfig,
    ) -> Result<Self> {
        let driver = Driver::with_config(options, sink, &config)?;
        let (tx, inbound) = mpsc::channel();
        Ok(Self {
            manager: ConnectionManager::new(transport, tx, &config),
            driver,
            inbound,
            buf: BytesMut::with_capacity(256),
        })
    }

    /// Host lifecycle start: open the transport. The driver starts waiting
    /// for the board once the link has settled.
    pub fn start(&mut self, now: Instant) -> ConnectionEvent {
        self.manager.connect(now)
    }

    /// Host lifecycle halt: stop the driver and close the transport.
    pub fn halt(&mut self) {
        self.driver.halt();
        self.manager.disconnect();
    }

    pub fn connect(&mut self, now: Instant) -> ConnectionEvent {
        self.manager.connect(now)
    }

    pub fn disconnect(&mut self) {
        self.manager.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Feed one transport event.
    pub fn handle_inbound(&mut self, inbound: Inbound, now: Instant) -> Option<ConnectionEvent> {
        match self.manager.handle_inbound(inbound, now) {
            Incoming::Line(line) => {
                self.handle_line(&line, now);
                None
            }
            Incoming::Lost => Some(ConnectionEvent::Lost),
            Incoming::Ignored => None,
        }
    }

    /// Feed one inbound line straight to the driver.
    pub fn handle_line(&mut self, line: &str, now: Instant) {
        if let Some(command) = self.driver.handle_line(line, now) {
            self.dispatch(&command);
        }
    }

    /// Fire due timers: the bootstrap configuration, then retry or settle.
    pub fn poll(&mut self, now: Instant) -> Option<ConnectionEvent> {
        if let Some(command) = self.driver.poll(now) {
            self.dispatch(&command);
        }
        let event = self.manager.poll(now);
        if event == Some(ConnectionEvent::Settled) {
            self.driver.start();
        }
        event
    }

    /// Earliest pending timer of the manager and the driver.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.manager.next_deadline(), self.driver.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run one turn of the event loop.
    ///
    /// Waits up to `max_wait` (less if a timer is due sooner) for inbound
    /// traffic, processes everything that has arrived in order, then fires
    /// due timers. Returns the connection transitions that happened.
    pub fn step(&mut self, max_wait: Duration) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        let wait = self
            .next_deadline()
            .map(|due| due.saturating_duration_since(Instant::now()).min(max_wait))
            .unwrap_or(max_wait);

        match self.inbound.recv_timeout(wait) {
            Ok(first) => {
                events.extend(self.handle_inbound(first, Instant::now()));
                while let Ok(next) = self.inbound.try_recv() {
                    events.extend(self.handle_inbound(next, Instant::now()));
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            // the manager holds a sender for as long as the link exists
            Err(RecvTimeoutError::Disconnected) => {}
        }

        events.extend(self.poll(Instant::now()));
        events
    }

    pub fn configure(&mut self, configuration: Configuration) -> Result<()> {
        let command = self.driver.configure(configuration);
        self.send(&command)
    }

    pub fn initialize_geometry(&mut self, geometry: &Geometry) -> Result<()> {
        let command = self.driver.initialize_geometry(geometry)?;
        self.send(&command)
    }

    pub fn calibrate_ahrs(&mut self, calibration: &AhrsCalibration) -> Result<()> {
        let command = self.driver.calibrate_ahrs(calibration)?;
        self.send(&command)
    }

    pub fn set_motor_power(&mut self, motion: Motion) -> Result<()> {
        let command = self.driver.set_motor_power(motion)?;
        self.send(&command)
    }

    pub fn drive_distance(&mut self, motion: Motion) -> Result<()> {
        let command = self.driver.drive_distance(motion)?;
        self.send(&command)
    }

    pub fn turn_to(&mut self, rotation: Rotation) -> Result<()> {
        let command = self.driver.turn_to(rotation)?;
        self.send(&command)
    }

    /// Enable the motor controllers. Only the first call sends anything.
    pub fn enable_motors(&mut self) -> Result<()> {
        match self.driver.enable_motors() {
            Some(command) => self.send(&command),
            None => Ok(()),
        }
    }

    pub fn reset(&mut self, reset: PoseReset) -> Result<()> {
        let command = self.driver.reset(reset)?;
        self.send(&command)
    }

    /// Encode a command and hand it to the manager. Delivery is best effort.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.buf.clear();
        encode_line(command, &mut self.buf)?;
        debug!(
            cmd = command.tag(),
            frame = %String::from_utf8_lossy(&self.buf).trim_end(),
            "sending"
        );
        self.manager.write(&self.buf);
        Ok(())
    }

    fn dispatch(&mut self, command: &Command) {
        if let Err(err) = self.send(command) {
            warn!(cmd = command.tag(), error = %err, "failed to send command");
        }
    }

    pub fn driver(&self) -> &Driver<S> {
        &self.driver
    }

    pub fn state(&self) -> &DeviceState {
        self.driver.state()
    }

    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ConnectionManager<T> {
        &mut self.manager
    }

    /// The event sink the driver emits to.
    pub fn events(&self) -> &S {
        self.driver.sink()
    }

    pub fn events_mut(&mut self) -> &mut S {
        self.driver.sink_mut()
    }
}
