use std::time::{Duration, Instant};

use pilotlink_frame::{decode_line, is_benign_diagnostic, Message, MessageKind};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::command::{Command, Configuration, Motion, PoseReset, Rotation};
use crate::config::LinkConfig;
use crate::error::Result;
use crate::events::{EventSink, LinkEvent};
use crate::options::{AhrsCalibration, DriverOptions, Geometry};
use crate::pose::Pose;
use crate::telemetry::{TelemetryLog, TelemetryRecord};

/// Driver lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Status {
    Initializing,
    WaitingForBoard,
    Ready,
}

/// Configuration the driver was constructed with.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub geometry: Geometry,
    pub ahrs_calibration: Option<AhrsCalibration>,
}

/// Everything the driver knows about the board.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pose: Pose,
    status: Status,
    config: DeviceConfig,
    motor_pid_log: TelemetryLog,
    heading_pid_log: TelemetryLog,
    motors_enabled: bool,
    board_ready: bool,
}

impl DeviceState {
    fn new(config: DeviceConfig, log_capacity: usize) -> Self {
        Self {
            pose: Pose::ORIGIN,
            status: Status::Initializing,
            config,
            motor_pid_log: TelemetryLog::new(log_capacity),
            heading_pid_log: TelemetryLog::new(log_capacity),
            motors_enabled: false,
            board_ready: false,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn motor_pid_log(&self) -> &TelemetryLog {
        &self.motor_pid_log
    }

    pub fn heading_pid_log(&self) -> &TelemetryLog {
        &self.heading_pid_log
    }

    pub fn motors_enabled(&self) -> bool {
        self.motors_enabled
    }

    pub fn board_ready(&self) -> bool {
        self.board_ready
    }

    fn advance(&mut self, status: Status) {
        if status > self.status {
            self.status = status;
        }
    }
}

/// One-shot bootstrap configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bootstrap {
    /// Waiting for the first board log line.
    Armed,
    /// First log line seen; configuration goes out at `due`.
    Scheduled { due: Instant },
    /// Configuration sent. Never re-arms.
    Fired,
}

/// Protocol state machine for the pilot board.
///
/// The driver does no I/O. Inbound lines go in through [`handle_line`], due
/// timers are serviced by [`poll`], and every operation that has to put a
/// frame on the wire hands back the [`Command`] to send. Notifications go to
/// the [`EventSink`] supplied at construction.
///
/// [`handle_line`]: Driver::handle_line
/// [`poll`]: Driver::poll
pub struct Driver<S> {
    state: DeviceState,
    bootstrap: Bootstrap,
    bootstrap_config: Configuration,
    bootstrap_delay: Duration,
    sink: S,
}

impl<S: EventSink> Driver<S> {
    /// Create a driver with default timing.
    ///
    /// Fails with a configuration error when the geometry is missing or
    /// incomplete.
    pub fn new(options: &DriverOptions, sink: S) -> Result<Self> {
        Self::with_config(options, sink, &LinkConfig::default())
    }

    pub fn with_config(options: &DriverOptions, sink: S, config: &LinkConfig) -> Result<Self> {
        let bootstrap_config = options.bootstrap_configuration()?;
        let device = DeviceConfig {
            geometry: options.geometry.unwrap_or_default(),
            ahrs_calibration: options.ahrs_calibration,
        };

        Ok(Self {
            state: DeviceState::new(device, config.log_capacity),
            bootstrap: Bootstrap::Armed,
            bootstrap_config,
            bootstrap_delay: config.bootstrap_delay,
            sink,
        })
    }

    /// Host lifecycle: the link is up and the driver should wait for the board.
    pub fn start(&mut self) {
        info!("driver online, waiting for board; do not move the robot");
        self.state.advance(Status::WaitingForBoard);
    }

    /// Host lifecycle: the driver is being stopped.
    pub fn halt(&mut self) {
        info!(status = ?self.state.status, "driver halted");
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Whether the bootstrap configuration has gone out.
    pub fn bootstrapped(&self) -> bool {
        self.bootstrap == Bootstrap::Fired
    }

    /// When [`poll`](Driver::poll) next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.bootstrap {
            Bootstrap::Scheduled { due } => Some(due),
            Bootstrap::Armed | Bootstrap::Fired => None,
        }
    }

    /// Release the bootstrap configuration once its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Command> {
        match self.bootstrap {
            Bootstrap::Scheduled { due } if now >= due => {
                self.bootstrap = Bootstrap::Fired;
                info!("sending bootstrap configuration");
                Some(Command::configure(self.bootstrap_config.clone()))
            }
            _ => None,
        }
    }

    /// Process one inbound line.
    ///
    /// Lines that do not parse are dropped: quietly when they are known
    /// board diagnostics, with a warning otherwise.
    pub fn handle_line(&mut self, line: &str, now: Instant) -> Option<Command> {
        match decode_line(line) {
            Ok(msg) => self.handle_message(msg, now),
            Err(_) if is_benign_diagnostic(line) => {
                trace!(line, "board diagnostic");
                None
            }
            Err(err) => {
                warn!(line, error = %err, "discarding malformed line from board");
                None
            }
        }
    }

    /// Process one decoded inbound message.
    pub fn handle_message(&mut self, msg: Message, now: Instant) -> Option<Command> {
        match msg.kind() {
            MessageKind::Log => {
                if self.bootstrap == Bootstrap::Armed {
                    debug!(delay = ?self.bootstrap_delay, "first board log line, scheduling bootstrap");
                    self.bootstrap = Bootstrap::Scheduled {
                        due: now + self.bootstrap_delay,
                    };
                }
                debug!(message = ?msg.body(), "board log");
                None
            }
            MessageKind::Pose => {
                match Pose::from_message(&msg) {
                    Some(pose) => {
                        self.state.pose = pose;
                        self.sink.emit(LinkEvent::Pose(pose));
                    }
                    None => warn!(message = ?msg.body(), "pose message without numeric X/Y/H"),
                }
                None
            }
            MessageKind::Moved => self.board_ready(),
            MessageKind::Motors => {
                self.state.motor_pid_log.push(TelemetryRecord {
                    received_at: now,
                    message: msg.into_body(),
                });
                None
            }
            MessageKind::HeadingPid => {
                self.state.heading_pid_log.push(TelemetryRecord {
                    received_at: now,
                    message: msg.into_body(),
                });
                None
            }
            MessageKind::Event => {
                info!(message = ?msg.body(), "board event");
                self.sink.emit(LinkEvent::Event(msg.into_body()));
                None
            }
            MessageKind::Unknown => {
                debug!(tag = ?msg.tag(), message = ?msg.body(), "unhandled board message");
                None
            }
        }
    }

    fn board_ready(&mut self) -> Option<Command> {
        if self.state.board_ready {
            return None;
        }
        self.state.board_ready = true;
        self.state.advance(Status::Ready);
        info!("board ready, awaiting commands");
        self.sink.emit(LinkEvent::Ready);
        Some(Command::Init)
    }

    pub fn configure(&self, configuration: Configuration) -> Command {
        debug!(?configuration, "configure");
        Command::configure(configuration)
    }

    pub fn initialize_geometry(&self, geometry: &Geometry) -> Result<Command> {
        Command::initialize_geometry(geometry)
    }

    pub fn calibrate_ahrs(&self, calibration: &AhrsCalibration) -> Result<Command> {
        Command::calibrate_ahrs(calibration)
    }

    pub fn set_motor_power(&self, motion: Motion) -> Result<Command> {
        debug!(?motion, "set motor power");
        Command::set_motor_power(motion)
    }

    pub fn drive_distance(&self, motion: Motion) -> Result<Command> {
        debug!(?motion, "drive distance");
        Command::drive_distance(motion)
    }

    pub fn turn_to(&self, rotation: Rotation) -> Result<Command> {
        debug!(?rotation, "turn");
        Command::turn_to(rotation)
    }

    /// Enable the motor controllers. Only the first call produces a command.
    pub fn enable_motors(&mut self) -> Option<Command> {
        if self.state.motors_enabled {
            return None;
        }
        self.state.motors_enabled = true;
        info!("enabling motors");
        Some(Command::enable_motors())
    }

    /// Reset the board's odometry. The local pose follows immediately;
    /// telemetry histories are kept.
    pub fn reset(&mut self, reset: PoseReset) -> Result<Command> {
        let command = Command::reset(reset)?;
        self.state.pose = Pose::new(
            reset.x.unwrap_or_default(),
            reset.y.unwrap_or_default(),
            reset.h.unwrap_or_default(),
        );
        Ok(command)
    }
}
