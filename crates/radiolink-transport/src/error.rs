use radiolink_frame::FrameError;

/// Errors that can occur in duplex transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The bus driver failed to complete the exchange.
    #[error("duplex exchange failed: {0}")]
    Exchange(std::io::Error),

    /// The chip-select line could not be driven.
    #[error("chip-select failed: {0}")]
    ChipSelect(std::io::Error),

    /// The outgoing frame could not be encoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
