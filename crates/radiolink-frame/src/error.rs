/// Errors that can occur during frame or packet encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The buffer is shorter than the fields its header declares.
    #[error("truncated data ({got} bytes, need at least {needed})")]
    DecodeTruncated { needed: usize, got: usize },

    /// The leading packet type byte is not a known (or implemented) type.
    #[error("unsupported packet type {0:#04x}")]
    UnsupportedType(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;
