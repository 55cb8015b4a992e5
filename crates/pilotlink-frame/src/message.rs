//! Inbound message kinds.
//!
//! The board tags each message with a `T` field. Kinds the link does not
//! know about are kept as [`MessageKind::Unknown`] rather than rejected.

use serde_json::{Map, Value};

/// Discriminator field carried by every inbound message.
pub const TYPE_FIELD: &str = "T";

/// Discriminator field carried by every outbound command.
pub const COMMAND_FIELD: &str = "Cmd";

/// Board log output. The first one triggers the bootstrap configuration.
pub const LOG: &str = "Log";
/// Position update with `X`, `Y` (meters) and `H` (degrees).
pub const POSE: &str = "Pose";
/// The board has moved, which also means it is ready for commands.
pub const MOVED: &str = "Moved";
/// Motor PID telemetry.
pub const MOTORS: &str = "Motors";
/// Heading PID telemetry.
pub const HEADING_PID: &str = "HdgPid";
/// Generic board event, forwarded to the host as-is.
pub const EVENT: &str = "Event";

/// Classified `T` discriminator of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Log,
    Pose,
    Moved,
    Motors,
    HeadingPid,
    Event,
    Unknown,
}

impl MessageKind {
    /// Classify a `T` value. Missing or unrecognized tags are `Unknown`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(LOG) => Self::Log,
            Some(POSE) => Self::Pose,
            Some(MOVED) => Self::Moved,
            Some(MOTORS) => Self::Motors,
            Some(HEADING_PID) => Self::HeadingPid,
            Some(EVENT) => Self::Event,
            _ => Self::Unknown,
        }
    }

    /// Wire name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Log => LOG,
            Self::Pose => POSE,
            Self::Moved => MOVED,
            Self::Motors => MOTORS,
            Self::HeadingPid => HEADING_PID,
            Self::Event => EVENT,
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// A decoded inbound message: its kind plus the complete JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: MessageKind,
    body: Map<String, Value>,
}

impl Message {
    pub fn new(body: Map<String, Value>) -> Self {
        let kind = MessageKind::from_tag(body.get(TYPE_FIELD).and_then(Value::as_str));
        Self { kind, body }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Raw `T` value, if present and a string.
    pub fn tag(&self) -> Option<&str> {
        self.body.get(TYPE_FIELD).and_then(Value::as_str)
    }

    /// Numeric field, if present and a number.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.body.get(field).and_then(Value::as_f64)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }
}
