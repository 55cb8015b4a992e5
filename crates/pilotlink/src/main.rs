mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pilotlink", version, about = "Pilot board serial link")]
struct Cli {
    /// Output format for notifications and summaries.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from([
            "pilotlink",
            "monitor",
            "/dev/ttyACM0",
            "--options",
            "robot.json",
            "--duration",
            "30s",
            "--enable-motors",
        ])
        .expect("monitor args should parse");

        match cli.command {
            Command::Monitor(args) => {
                assert_eq!(args.link.port, "/dev/ttyACM0");
                assert_eq!(args.link.baud, 115_200);
                assert_eq!(args.duration.as_deref(), Some("30s"));
                assert!(args.enable_motors);
                assert!(!args.summary);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_negative_headings() {
        let cli = Cli::try_parse_from([
            "pilotlink",
            "turn",
            "COM3",
            "-o",
            "robot.json",
            "--heading",
            "-90",
            "--power",
            "0.5",
        ])
        .expect("turn args should parse");

        match cli.command {
            Command::Turn(args) => {
                assert_eq!(args.heading, Some(-90.0));
                assert_eq!(args.power, Some(0.5));
                assert_eq!(args.session.connect_timeout, "15s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pilotlink",
            "power",
            "/dev/ttyUSB0",
            "--options",
            "robot.json",
            "--m1",
            "120",
            "--m2",
            "-120",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("power args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(cli.command, Command::Power(_)));
    }

    #[test]
    fn options_file_is_required() {
        let err = Cli::try_parse_from(["pilotlink", "reset", "/dev/ttyACM0"])
            .expect_err("missing --options should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_version_subcommand() {
        let cli = Cli::try_parse_from(["pilotlink", "version", "--extended"])
            .expect("version args should parse");
        assert!(matches!(cli.command, Command::Version(args) if args.extended));
    }
}
