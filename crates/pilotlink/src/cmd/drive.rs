use pilotlink_link::{Command, ConnectionEvent, EventSink, Link, Motion, PoseReset, Rotation};
use pilotlink_transport::Transport;

use crate::cmd::session::{parse_duration, Outcome, Session};
use crate::cmd::{DriveArgs, OneShotArgs, PowerArgs, ResetArgs, TurnArgs};
use crate::exit::{link_error, CliError, CliResult, INTERRUPTED, LINK_LOST, SUCCESS, TIMEOUT};
use crate::output::OutputFormat;

pub fn drive(args: DriveArgs, format: OutputFormat) -> CliResult<i32> {
    let command = Command::drive_distance(Motion {
        distance: args.distance,
        heading: args.heading,
        power: args.power,
        ..Motion::default()
    })
    .map_err(|err| link_error("drive", err))?;
    send_once(&args.session, &command, format)
}

pub fn turn(args: TurnArgs, format: OutputFormat) -> CliResult<i32> {
    let command = Command::turn_to(Rotation {
        heading: args.heading,
        power: args.power,
    })
    .map_err(|err| link_error("turn", err))?;
    send_once(&args.session, &command, format)
}

pub fn power(args: PowerArgs, format: OutputFormat) -> CliResult<i32> {
    let command = Command::set_motor_power(Motion {
        m1: args.m1,
        m2: args.m2,
        ..Motion::default()
    })
    .map_err(|err| link_error("power", err))?;
    send_once(&args.session, &command, format)
}

pub fn reset(args: ResetArgs, format: OutputFormat) -> CliResult<i32> {
    let command = Command::reset(PoseReset {
        x: args.x,
        y: args.y,
        h: args.h,
    })
    .map_err(|err| link_error("reset", err))?;
    send_once(&args.session, &command, format)
}

/// Connect, wait until the bootstrap configuration has gone out, send
/// `command`, then optionally keep printing notifications before halting.
///
/// The board drops the first frame it sees after the port opens; the
/// bootstrap configuration takes that slot, so `command` is held until then.
/// The command is validated before anything is opened.
fn send_once(args: &OneShotArgs, command: &Command, format: OutputFormat) -> CliResult<i32> {
    let connect_timeout = parse_duration(&args.connect_timeout)?;
    let follow = args.follow.as_deref().map(parse_duration).transpose()?;

    let mut session = Session::open(&args.link, format)?;
    let booted = session.run_until(Some(connect_timeout), |link, _| Ok(board_booted(link)))?;
    match booted {
        Outcome::Done => {}
        Outcome::Interrupted => {
            session.finish(false);
            return Ok(INTERRUPTED);
        }
        Outcome::Elapsed => {
            session.finish(false);
            return Err(CliError::new(
                TIMEOUT,
                format!(
                    "board on {} did not finish booting within {connect_timeout:?}",
                    args.link.port
                ),
            ));
        }
    }

    session
        .link_mut()
        .send(command)
        .map_err(|err| link_error(command.tag(), err))?;

    let mut code = SUCCESS;
    if let Some(follow) = follow {
        let outcome = session.run_until(Some(follow), |_, transitions| {
            if transitions.contains(&ConnectionEvent::Lost) {
                return Err(CliError::new(LINK_LOST, "link lost while following"));
            }
            Ok(false)
        });
        code = match outcome {
            Ok(Outcome::Interrupted) => INTERRUPTED,
            Ok(_) => SUCCESS,
            Err(err) => {
                session.finish(false);
                return Err(err);
            }
        };
    }

    session.finish(false);
    Ok(code)
}

/// Whether a one-shot command can go out without being swallowed by the
/// board's post-open discard.
fn board_booted<T: Transport, S: EventSink>(link: &Link<T, S>) -> bool {
    link.manager().is_settled() && link.driver().bootstrapped()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use pilotlink_link::{DriverOptions, Geometry, LinkEvent};
    use pilotlink_transport::{LineSink, Result as TransportResult};

    use super::*;

    struct Loopback;

    impl Transport for Loopback {
        fn open(&mut self, _sink: LineSink) -> TransportResult<()> {
            Ok(())
        }

        fn close(&mut self) {}

        fn write(&mut self, _bytes: &[u8]) -> TransportResult<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "loopback"
        }
    }

    #[test]
    fn one_shot_waits_for_the_bootstrap_frame() {
        let options = DriverOptions::new(Geometry::new(4900.0, 450.0));
        let mut link = Link::new(Loopback, &options, Vec::<LinkEvent>::new()).unwrap();
        let t0 = Instant::now();

        link.start(t0);
        assert!(!board_booted(&link));

        let settled = t0 + Duration::from_secs(2);
        link.poll(settled);
        assert!(link.manager().is_settled());
        assert!(!board_booted(&link), "settled but the board has not booted");

        link.handle_line(r#"{"T":"Log","Msg":"boot"}"#, settled);
        link.poll(settled + Duration::from_millis(199));
        assert!(!board_booted(&link));

        link.poll(settled + Duration::from_millis(200));
        assert!(board_booted(&link));
    }
}
