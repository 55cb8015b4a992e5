use pilotlink_link::config::{
    DEFAULT_BOOTSTRAP_DELAY, DEFAULT_LOG_CAPACITY, DEFAULT_RETRY_INTERVAL, DEFAULT_SETTLE_DELAY,
};
use pilotlink_transport::DEFAULT_BAUD_RATE;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("pilotlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: pilotlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("PILOTLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: serial={}, cli=true", cfg!(feature = "serial"));
    println!("baud_rate: {DEFAULT_BAUD_RATE}");
    println!(
        "timing: retry={:?}, settle={:?}, bootstrap={:?}",
        DEFAULT_RETRY_INTERVAL, DEFAULT_SETTLE_DELAY, DEFAULT_BOOTSTRAP_DELAY
    );
    println!("telemetry_log_capacity: {DEFAULT_LOG_CAPACITY}");

    Ok(SUCCESS)
}
