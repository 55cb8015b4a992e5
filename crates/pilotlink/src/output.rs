use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pilotlink_link::{DeviceState, LinkEvent, Pose, Status};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    event: &'a str,
    elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pose: Option<Pose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a Map<String, Value>>,
}

#[derive(Serialize)]
struct StateOutput {
    status: Status,
    pose: Pose,
    board_ready: bool,
    motors_enabled: bool,
    motor_pid_records: usize,
    heading_pid_records: usize,
    attempts: u64,
    dropped_writes: u64,
}

/// Print one driver notification. `elapsed` is time since the link started.
pub fn print_event(event: &LinkEvent, elapsed: Duration, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                event: event.name(),
                elapsed_ms: elapsed.as_millis(),
                pose: match event {
                    LinkEvent::Pose(pose) => Some(*pose),
                    _ => None,
                },
                message: match event {
                    LinkEvent::Event(message) => Some(message),
                    _ => None,
                },
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ELAPSED", "EVENT", "DETAIL"])
                .add_row(vec![
                    format!("{:.3}s", elapsed.as_secs_f64()),
                    event.name().to_string(),
                    detail(event),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "[{:>9.3}s] {:<5} {}",
                elapsed.as_secs_f64(),
                event.name(),
                detail(event)
            );
        }
    }
}

/// Print a summary of what the driver knows about the board.
pub fn print_state(state: &DeviceState, attempts: u64, dropped_writes: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = StateOutput {
                status: state.status(),
                pose: state.pose(),
                board_ready: state.board_ready(),
                motors_enabled: state.motors_enabled(),
                motor_pid_records: state.motor_pid_log().len(),
                heading_pid_records: state.heading_pid_log().len(),
                attempts,
                dropped_writes,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["status".to_string(), format!("{:?}", state.status())])
                .add_row(vec!["pose".to_string(), state.pose().to_string()])
                .add_row(vec!["board ready".to_string(), state.board_ready().to_string()])
                .add_row(vec![
                    "motors enabled".to_string(),
                    state.motors_enabled().to_string(),
                ])
                .add_row(vec![
                    "motor PID records".to_string(),
                    state.motor_pid_log().len().to_string(),
                ])
                .add_row(vec![
                    "heading PID records".to_string(),
                    state.heading_pid_log().len().to_string(),
                ])
                .add_row(vec!["open attempts".to_string(), attempts.to_string()])
                .add_row(vec!["dropped writes".to_string(), dropped_writes.to_string()]);
            println!("{table}");
        }
    }
}

fn detail(event: &LinkEvent) -> String {
    match event {
        LinkEvent::Ready => "board ready".to_string(),
        LinkEvent::Pose(pose) => pose.to_string(),
        LinkEvent::Event(message) => Value::Object(message.clone()).to_string(),
    }
}
