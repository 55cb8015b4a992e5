use std::path::PathBuf;

use clap::{Args, Subcommand};
use pilotlink_transport::DEFAULT_BAUD_RATE;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod drive;
pub mod monitor;
pub mod session;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Keep a link open and print board notifications.
    Monitor(MonitorArgs),
    /// Drive a distance, optionally holding a heading.
    Drive(DriveArgs),
    /// Turn to an absolute heading.
    Turn(TurnArgs),
    /// Set raw motor outputs.
    Power(PowerArgs),
    /// Reset the board's odometry.
    Reset(ResetArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Drive(args) => drive::drive(args, format),
        Command::Turn(args) => drive::turn(args, format),
        Command::Power(args) => drive::power(args, format),
        Command::Reset(args) => drive::reset(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PortArgs {
    /// Serial device of the board (e.g. /dev/ttyACM0, COM3).
    pub port: String,
    /// Driver options file: geometry, mPID, hPID, ahrsCalibration.
    #[arg(long, short = 'o', value_name = "FILE", env = "PILOTLINK_OPTIONS")]
    pub options: PathBuf,
    /// Serial baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub link: PortArgs,
    /// Stop after this long (e.g. 30s, 500ms, 5m). Default: until Ctrl-C.
    #[arg(long)]
    pub duration: Option<String>,
    /// Enable the motor controllers once the link has settled.
    #[arg(long)]
    pub enable_motors: bool,
    /// Print a device state summary on exit.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args, Debug)]
pub struct OneShotArgs {
    #[command(flatten)]
    pub link: PortArgs,
    /// Give up if the board has not finished booting within this long.
    #[arg(long, default_value = "15s")]
    pub connect_timeout: String,
    /// Keep printing notifications for this long after sending.
    #[arg(long)]
    pub follow: Option<String>,
}

#[derive(Args, Debug)]
pub struct DriveArgs {
    #[command(flatten)]
    pub session: OneShotArgs,
    /// Distance in meters.
    #[arg(long, allow_negative_numbers = true)]
    pub distance: Option<f64>,
    /// Heading to hold, in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub heading: Option<f64>,
    /// Drive power.
    #[arg(long)]
    pub power: Option<f64>,
}

#[derive(Args, Debug)]
pub struct TurnArgs {
    #[command(flatten)]
    pub session: OneShotArgs,
    /// Target heading in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub heading: Option<f64>,
    /// Turn power.
    #[arg(long)]
    pub power: Option<f64>,
}

#[derive(Args, Debug)]
pub struct PowerArgs {
    #[command(flatten)]
    pub session: OneShotArgs,
    /// Left motor output.
    #[arg(long, allow_negative_numbers = true)]
    pub m1: Option<f64>,
    /// Right motor output.
    #[arg(long, allow_negative_numbers = true)]
    pub m2: Option<f64>,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub session: OneShotArgs,
    #[arg(long, allow_negative_numbers = true)]
    pub x: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub y: Option<f64>,
    /// Heading in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub h: Option<f64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
