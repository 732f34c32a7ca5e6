//! Duplex exchange transport for SPI-attached radio peripherals.
//!
//! The host talks to the radio over a full-duplex bus: every exchange clocks
//! out a fixed-size transfer and clocks in the same number of bytes, framed
//! by the chip-select line. A separate "data ready" line pulses when the
//! peripheral has a frame waiting.
//!
//! This crate owns the chip-select discipline around each exchange. The bus,
//! pin, clock, delay and signal line are collaborator traits; in-memory
//! implementations live in [`loopback`] and [`clock`].

pub mod clock;
pub mod duplex;
pub mod error;
pub mod loopback;
pub mod traits;

pub use clock::{ManualClock, NoDelay, SystemClock, ThreadDelay};
pub use duplex::DuplexTransport;
pub use error::{Result, TransportError};
pub use loopback::{EdgeLine, LoopbackBus, RecordingPin};
pub use traits::{ChipSelect, Clock, Delay, DuplexBus, EdgeCallback, SignalSource};
