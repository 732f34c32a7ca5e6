use bytes::Bytes;
use radiolink_frame::{command_name, parse_frame, Frame, FrameConfig, TRANSFER_SIZE};
use tracing::{debug, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::{ChipSelect, DuplexBus};

/// Exchanges fixed-size frames over a duplex bus.
///
/// Every exchange asserts chip-select, clocks one [`TRANSFER_SIZE`] buffer in
/// each direction, and deasserts chip-select, also when the bus fails.
pub struct DuplexTransport<B, C> {
    bus: B,
    chip_select: C,
    config: FrameConfig,
    exchanges: u64,
}

impl<B: DuplexBus, C: ChipSelect> DuplexTransport<B, C> {
    /// Create a transport with default configuration.
    pub fn new(bus: B, chip_select: C) -> Self {
        Self::with_config(bus, chip_select, FrameConfig::default())
    }

    /// Create a transport with explicit configuration.
    pub fn with_config(bus: B, chip_select: C, config: FrameConfig) -> Self {
        Self {
            bus,
            chip_select,
            config,
            exchanges: 0,
        }
    }

    /// Send a frame, discarding whatever the peripheral clocks back.
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        self.transfer_frame(frame)?;
        debug!(
            command = command_name(frame.protocol_id),
            len = frame.payload.len(),
            "frame sent"
        );
        Ok(())
    }

    /// Poll the peripheral with a `READ` frame and decode its reply.
    ///
    /// Returns `Ok(None)` when the reply carries no payload.
    pub fn receive_raw(&mut self) -> Result<Option<Bytes>> {
        Ok(self.receive_frame()?.map(|frame| frame.payload))
    }

    /// Like [`receive_raw`](Self::receive_raw), keeping the reply's protocol id.
    pub fn receive_frame(&mut self) -> Result<Option<Frame>> {
        let rx = self.transfer_frame(&Frame::read_request())?;
        let frame = parse_frame(&rx);
        match &frame {
            Some(frame) => trace!(len = frame.payload.len(), "frame received"),
            None => trace!("no frame pending"),
        }
        Ok(frame)
    }

    /// Encode `frame` into one transfer and return the bytes clocked in.
    pub fn transfer_frame(&mut self, frame: &Frame) -> Result<[u8; TRANSFER_SIZE]> {
        let tx = frame.to_transfer(self.config.max_payload_size)?;
        self.exchange(&tx)
    }

    fn exchange(&mut self, tx: &[u8; TRANSFER_SIZE]) -> Result<[u8; TRANSFER_SIZE]> {
        let mut rx = [0u8; TRANSFER_SIZE];

        self.chip_select.assert().map_err(|err| {
            warn!(%err, "chip-select assert failed");
            TransportError::ChipSelect(err)
        })?;
        let transferred = self.bus.transfer(tx, &mut rx);
        let released = self.chip_select.deassert();

        self.exchanges = self.exchanges.wrapping_add(1);

        transferred.map_err(|err| {
            warn!(%err, "duplex exchange failed");
            TransportError::Exchange(err)
        })?;
        released.map_err(|err| {
            warn!(%err, "chip-select deassert failed");
            TransportError::ChipSelect(err)
        })?;
        Ok(rx)
    }

    /// Number of exchanges attempted, including failed ones.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges
    }

    /// Borrow the underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the underlying bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Borrow the chip-select line.
    pub fn chip_select(&self) -> &C {
        &self.chip_select
    }

    /// Consume the transport and return the bus and chip-select line.
    pub fn into_parts(self) -> (B, C) {
        (self.bus, self.chip_select)
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current transport configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
