use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pilotlink_link::{ConnectionEvent, DriverOptions, Link, LinkEvent};
use pilotlink_transport::{SerialConfig, SerialTransport};
use tracing::info;

use crate::cmd::PortArgs;
use crate::exit::{io_error, link_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::{print_event, print_state, OutputFormat};

/// Longest a single event-loop turn blocks, so Ctrl-C is noticed promptly.
const STEP: Duration = Duration::from_millis(100);

pub type SerialLink = Link<SerialTransport, Vec<LinkEvent>>;

/// Why [`Session::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Elapsed,
    Interrupted,
}

/// A started link to a board plus the bookkeeping the CLI needs around it.
pub struct Session {
    link: SerialLink,
    started: Instant,
    running: Arc<AtomicBool>,
    format: OutputFormat,
}

impl Session {
    /// Load driver options, build the link and start connecting.
    pub fn open(args: &PortArgs, format: OutputFormat) -> CliResult<Self> {
        let options = load_options(args)?;
        let transport = SerialTransport::new(SerialConfig {
            baud_rate: args.baud,
            ..SerialConfig::new(&args.port)
        });
        let mut link = Link::new(transport, &options, Vec::<LinkEvent>::new())
            .map_err(|err| link_error("driver options rejected", err))?;

        let running = Arc::new(AtomicBool::new(true));
        install_ctrlc_handler(running.clone())?;

        let started = Instant::now();
        info!(port = %args.port, baud = args.baud, "starting link");
        link.start(started);

        Ok(Self {
            link,
            started,
            running,
            format,
        })
    }

    pub fn link_mut(&mut self) -> &mut SerialLink {
        &mut self.link
    }

    /// Run the event loop until `done` says so, `limit` passes or Ctrl-C.
    ///
    /// Notifications are printed as they arrive. `done` sees the link and the
    /// connection transitions of the last turn.
    pub fn run_until<F>(&mut self, limit: Option<Duration>, mut done: F) -> CliResult<Outcome>
    where
        F: FnMut(&mut SerialLink, &[ConnectionEvent]) -> CliResult<bool>,
    {
        let deadline = limit.map(|limit| Instant::now() + limit);
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Ok(Outcome::Interrupted);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(Outcome::Elapsed);
            }

            let transitions = self.link.step(STEP);
            self.flush_events();
            if done(&mut self.link, &transitions)? {
                return Ok(Outcome::Done);
            }
        }
    }

    /// Halt the link, optionally printing what the driver ended up knowing.
    pub fn finish(mut self, summary: bool) {
        self.link.halt();
        self.flush_events();
        if summary {
            let manager = self.link.manager();
            print_state(
                self.link.state(),
                manager.attempts(),
                manager.dropped_writes(),
                self.format,
            );
        }
    }

    fn flush_events(&mut self) {
        let elapsed = self.started.elapsed();
        for event in self.link.events_mut().drain(..) {
            print_event(&event, elapsed, self.format);
        }
    }
}

fn load_options(args: &PortArgs) -> CliResult<DriverOptions> {
    let path = &args.options;
    let json = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    DriverOptions::from_json(&json)
        .map_err(|err| link_error(&format!("invalid options in {}", path.display()), err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Parse `500ms`, `30s`, `5m` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, scale_ms) = if let Some(num) = input.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, 1_000)
    } else if let Some(num) = input.strip_suffix('m') {
        (num, 60_000)
    } else {
        (input, 1_000)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    value
        .checked_mul(scale_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| CliError::new(USAGE, format!("duration out of range: {input}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::exit::CONFIG_INVALID;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
        assert_eq!(parse_duration("1h").unwrap_err().code, USAGE);
    }

    fn temp_options(tag: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "pilotlink-options-{tag}-{}.json",
            std::process::id()
        ));
        fs::write(&path, contents).expect("options file should be writable");
        path
    }

    fn port_args(options: PathBuf) -> PortArgs {
        PortArgs {
            port: "/dev/ttyACM0".to_string(),
            options,
            baud: 115_200,
        }
    }

    #[test]
    fn load_options_reads_json_file() {
        let path = temp_options(
            "ok",
            r#"{ "geometry": { "ticksPerMeter": 4900, "mMax": 450 }, "hPID": [2, 0, 0.5] }"#,
        );
        let options = load_options(&port_args(path.clone())).expect("options should load");
        assert_eq!(options.heading_pid, Some([2.0, 0.0, 0.5]));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_options_failures_are_config_errors() {
        let missing = std::env::temp_dir().join("pilotlink-options-does-not-exist.json");
        let err = load_options(&port_args(missing)).unwrap_err();
        assert_eq!(err.code, CONFIG_INVALID);

        let path = temp_options("bad", "{ geometry");
        let err = load_options(&port_args(path.clone())).unwrap_err();
        assert_eq!(err.code, CONFIG_INVALID);
        let _ = fs::remove_file(path);
    }
}
