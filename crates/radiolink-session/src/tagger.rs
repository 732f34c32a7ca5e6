/// Wrapping counters for outgoing serials and received frames.
///
/// The two counters are independent: the serial stamped on outgoing packets
/// never advances because of inbound traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tagger {
    tx_serial: u32,
    rx_frames: u32,
}

impl Tagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the outgoing serial counter at `serial`.
    pub fn starting_at(serial: u32) -> Self {
        Self {
            tx_serial: serial,
            rx_frames: 0,
        }
    }

    /// The serial the next outgoing packet will carry.
    pub fn peek_serial(&self) -> u32 {
        self.tx_serial.wrapping_add(1)
    }

    /// Advance and return the outgoing serial.
    pub fn next_serial(&mut self) -> u32 {
        self.tx_serial = self.tx_serial.wrapping_add(1);
        self.tx_serial
    }

    /// Count one received frame.
    pub fn record_frame(&mut self) -> u32 {
        self.rx_frames = self.rx_frames.wrapping_add(1);
        self.rx_frames
    }

    /// Last serial stamped on an outgoing packet.
    pub fn tx_serial(&self) -> u32 {
        self.tx_serial
    }

    /// Frames received so far (wrapping).
    pub fn rx_frames(&self) -> u32 {
        self.rx_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_wraps_to_zero() {
        let mut tagger = Tagger::starting_at(0xFFFF_FFFF);
        assert_eq!(tagger.peek_serial(), 0);
        assert_eq!(tagger.next_serial(), 0);
        assert_eq!(tagger.next_serial(), 1);
    }

    #[test]
    fn counters_are_independent() {
        let mut tagger = Tagger::new();
        tagger.next_serial();
        tagger.record_frame();
        tagger.record_frame();
        assert_eq!(tagger.tx_serial(), 1);
        assert_eq!(tagger.rx_frames(), 2);
        assert_eq!(tagger.next_serial(), 2);
    }
}
