//! Framed typed-message transport for SPI-attached radio peripherals.
//!
//! # Crate Structure
//!
//! - [`frame`]: Fixed-size frame codec and typed packet model
//! - [`transport`]: Chip-select framed duplex exchanges and collaborator traits
//! - [`session`]: Send API, receive dispatcher, sinks and latched link state

/// Re-export frame and packet types.
pub mod frame {
    pub use radiolink_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use radiolink_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use radiolink_session::*;
}
