use bytes::{BufMut, BytesMut};
use serde::Serialize;
use serde_json::Value;

use crate::error::{FrameError, Result};
use crate::message::Message;

/// Line terminator used in both directions.
pub const TERMINATOR: u8 = b'\n';

/// Encode a value as one compact JSON line.
///
/// Wire format:
/// ```text
/// {"Cmd":"MOV","Dist":1.0001}\n
/// ```
///
/// Compact JSON escapes control characters inside strings, so the only raw
/// newline in the output is the terminator.
pub fn encode_line<T: Serialize + ?Sized>(value: &T, dst: &mut BytesMut) -> Result<()> {
    let mut writer = dst.writer();
    serde_json::to_writer(&mut writer, value)?;
    let dst = writer.into_inner();
    dst.put_u8(TERMINATOR);
    Ok(())
}

/// Decode one inbound line (without its terminator) into a [`Message`].
pub fn decode_line(line: &str) -> Result<Message> {
    match serde_json::from_str::<Value>(line.trim_end())? {
        Value::Object(body) => Ok(Message::new(body)),
        other => Err(FrameError::Malformed(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

/// Whether an unparsable line is harmless board diagnostic output.
///
/// The firmware prints motor encoder ticks as bare lines ending in `M`
/// followed by the motor digit (e.g. `1532 M1`). Those are dropped quietly.
pub fn is_benign_diagnostic(line: &str) -> bool {
    let mut tail = line.chars().rev();
    matches!(
        (tail.next(), tail.next()),
        (Some(digit), Some('M')) if digit.is_ascii_digit()
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
