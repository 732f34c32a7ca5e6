//! Collaborator interfaces consumed by the transport and session layers.

use std::io;

/// Full-duplex bus primitive.
///
/// One call clocks out `tx` and fills `rx` with the bytes clocked in. Both
/// slices have the same length.
pub trait DuplexBus {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()>;
}

/// Binary chip-select output framing each exchange.
pub trait ChipSelect {
    fn assert(&mut self) -> io::Result<()>;
    fn deassert(&mut self) -> io::Result<()>;
}

/// Monotonic millisecond clock. Wraps at `u32::MAX`.
pub trait Clock {
    fn now_millis(&self) -> u32;
}

/// Bounded sleep.
pub trait Delay {
    fn sleep_ms(&self, ms: u32);
}

/// Callback invoked on every "data ready" edge.
pub type EdgeCallback = Box<dyn FnMut() + Send>;

/// Source of "data ready" edges.
///
/// Registering a callback replaces any previous one. Whether edges arriving
/// while a callback runs are queued or dropped is up to the source.
pub trait SignalSource {
    fn on_edge(&mut self, callback: EdgeCallback);
}

impl<T: DuplexBus + ?Sized> DuplexBus for &mut T {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        (**self).transfer(tx, rx)
    }
}

impl<T: DuplexBus + ?Sized> DuplexBus for Box<T> {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        (**self).transfer(tx, rx)
    }
}

impl<T: ChipSelect + ?Sized> ChipSelect for Box<T> {
    fn assert(&mut self) -> io::Result<()> {
        (**self).assert()
    }

    fn deassert(&mut self) -> io::Result<()> {
        (**self).deassert()
    }
}

impl<T: Clock + ?Sized> Clock for Box<T> {
    fn now_millis(&self) -> u32 {
        (**self).now_millis()
    }
}

impl<T: Delay + ?Sized> Delay for Box<T> {
    fn sleep_ms(&self, ms: u32) {
        (**self).sleep_ms(ms)
    }
}
