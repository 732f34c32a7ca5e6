/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] radiolink_transport::TransportError),

    /// Frame or packet encoding error.
    #[error("frame error: {0}")]
    Frame(#[from] radiolink_frame::FrameError),

    /// A registered sink panicked while handling a received frame.
    #[error("sink panicked: {0}")]
    SinkPanicked(String),

    /// Configuration file could not be read.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
