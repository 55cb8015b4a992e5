/// Errors that can occur while encoding or decoding a line.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The line is not valid JSON, or a value could not be serialized.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The line is valid JSON but not a message object.
    #[error("malformed message: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
