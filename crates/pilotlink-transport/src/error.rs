/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named endpoint.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on an open transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation needs an open transport.
    #[error("transport is not open")]
    NotOpen,

    /// An inbound line exceeded the configured maximum length.
    #[error("inbound line too long ({len} bytes, max {max})")]
    LineTooLong { len: usize, max: usize },

    /// The stream reached end of file.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
