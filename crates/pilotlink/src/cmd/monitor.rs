use crate::cmd::session::{parse_duration, Outcome, Session};
use crate::cmd::MonitorArgs;
use crate::exit::{link_error, CliResult, INTERRUPTED, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let limit = args.duration.as_deref().map(parse_duration).transpose()?;
    let mut session = Session::open(&args.link, format)?;

    let outcome = session.run_until(limit, |link, _| {
        if args.enable_motors && link.manager().is_settled() && !link.state().motors_enabled() {
            link.enable_motors()
                .map_err(|err| link_error("enable motors failed", err))?;
        }
        Ok(false)
    })?;

    session.finish(args.summary);
    match outcome {
        Outcome::Interrupted => Ok(INTERRUPTED),
        Outcome::Done | Outcome::Elapsed => Ok(SUCCESS),
    }
}
