//! Newline-delimited JSON framing for the pilot board link.
//!
//! Every message on the wire, in either direction, is one line holding one
//! JSON object:
//! - outbound commands carry a `Cmd` discriminator as their first field
//! - inbound messages carry a `T` discriminator naming the message kind
//!
//! The board also prints bare diagnostic lines that are not JSON at all;
//! [`is_benign_diagnostic`] recognizes the harmless ones.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode_line, encode_line, is_benign_diagnostic};
pub use error::{FrameError, Result};
pub use message::{Message, MessageKind, COMMAND_FIELD, TYPE_FIELD};
