use bytes::Bytes;
use radiolink_frame::{
    decode_packet, encode_buffer, encode_number, encode_string, encode_value, Frame, Packet,
    SET_GROUP, TRANSMIT,
};
use radiolink_transport::{
    ChipSelect, Clock, Delay, DuplexBus, DuplexTransport, SystemClock, ThreadDelay,
};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::rssi::{rssi_from_reply, rssi_from_trailing_byte};
use crate::sinks::{SinkKind, SinkRegistry};
use crate::state::{LinkState, SessionStats};
use crate::tagger::Tagger;

/// What one dispatcher run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The peripheral had nothing pending. No sink was called.
    Empty,
    /// A frame was received and fanned out to the registered sinks.
    Delivered(Packet),
    /// Another edge was still being handled; this one was dropped.
    Busy,
    /// The exchange failed or a sink panicked; the error is latched.
    Failed,
}

/// A framed link to one radio peripheral.
///
/// Owns the transport, the latched link state, the counters and the
/// registered sinks. Every method takes `&mut self`, so channel use is
/// serialised by ownership; share across threads with
/// [`SessionHandle`](crate::SessionHandle).
///
/// Operations return `Result`, and every failure is also latched for
/// [`last_error`](Self::last_error) and reported to the error sink, once
/// per failing operation.
pub struct Session<B, C> {
    transport: DuplexTransport<B, C>,
    config: SessionConfig,
    tagger: Tagger,
    clock: Box<dyn Clock + Send>,
    delay: Box<dyn Delay + Send>,
    state: LinkState,
    sinks: SinkRegistry,
    stats: SessionStats,
}

impl<B: DuplexBus, C: ChipSelect> Session<B, C> {
    /// Create a session with default configuration, system clock and
    /// thread sleep.
    pub fn new(bus: B, chip_select: C) -> Self {
        Self::with_config(bus, chip_select, SessionConfig::default())
    }

    /// Create a session with explicit configuration.
    pub fn with_config(bus: B, chip_select: C, config: SessionConfig) -> Self {
        let transport = DuplexTransport::with_config(bus, chip_select, config.frame_config());
        Self {
            transport,
            config,
            tagger: Tagger::new(),
            clock: Box::new(SystemClock::new()),
            delay: Box::new(ThreadDelay),
            state: LinkState::default(),
            sinks: SinkRegistry::default(),
            stats: SessionStats::default(),
        }
    }

    /// Replace the millisecond clock.
    pub fn with_clock(mut self, clock: impl Clock + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the sleep primitive used by [`request_rssi`](Self::request_rssi).
    pub fn with_delay(mut self, delay: impl Delay + Send + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    /// Replace the serial/frame counters.
    pub fn with_tagger(mut self, tagger: Tagger) -> Self {
        self.tagger = tagger;
        self
    }

    /// Reset latches and apply the configured radio group, if any.
    pub fn init(&mut self) -> Result<()> {
        self.state.reset();
        info!(
            max_payload = self.transport.config().max_payload_size,
            rssi_command = self.config.rssi_command,
            "radio session initialised"
        );
        match self.config.radio_group {
            Some(group) => self.set_radio_group(group),
            None => Ok(()),
        }
    }

    /// Send text as an untyped frame payload (no packet header).
    pub fn send_raw(&mut self, text: &str) -> Result<()> {
        let frame = Frame::new(TRANSMIT, Bytes::copy_from_slice(text.as_bytes()));
        let result = self.transport.send(&frame).map_err(SessionError::from);
        self.settle(result)
    }

    /// Send a `Number` packet.
    pub fn send_number(&mut self, value: i32) -> Result<()> {
        let result = self.send_packet(|timestamp, serial, _| {
            Ok(encode_number(value, timestamp, serial))
        });
        self.settle(result)
    }

    /// Send a `String` packet.
    pub fn send_string(&mut self, text: &str) -> Result<()> {
        let result = self.send_packet(|timestamp, serial, max| {
            encode_string(text, timestamp, serial, max)
        });
        self.settle(result)
    }

    /// Send a `Value` (name + number) packet.
    pub fn send_value(&mut self, name: &str, value: i32) -> Result<()> {
        let result = self.send_packet(|timestamp, serial, max| {
            encode_value(name, value, timestamp, serial, max)
        });
        self.settle(result)
    }

    /// Send a `Buffer` packet.
    pub fn send_buffer(&mut self, data: &[u8]) -> Result<()> {
        let result = self.send_packet(|timestamp, serial, max| {
            encode_buffer(data, timestamp, serial, max)
        });
        self.settle(result)
    }

    /// Move the radio to another group.
    pub fn set_radio_group(&mut self, group: u8) -> Result<()> {
        let result = self
            .transport
            .send(&Frame::new(SET_GROUP, vec![group]))
            .map_err(SessionError::from);
        if result.is_ok() {
            self.config.radio_group = Some(group);
            debug!(group, "radio group set");
        }
        self.settle(result)
    }

    /// Ask the radio for its signal strength.
    ///
    /// Sends the configured RSSI command, waits `rssi_wait_ms`, then reads
    /// once. Returns `Ok(None)` when nothing came back in time. Radio
    /// firmware is not required to support this.
    pub fn request_rssi(&mut self) -> Result<Option<i32>> {
        let result = self.request_rssi_inner();
        self.settle(result)
    }

    fn request_rssi_inner(&mut self) -> Result<Option<i32>> {
        let command = Frame::new(self.config.rssi_command, vec![0u8]);
        self.transport.send(&command)?;
        self.delay.sleep_ms(self.config.rssi_wait_ms);

        let Some(reply) = self.transport.receive_raw()? else {
            debug!("no reply to RSSI request");
            return Ok(None);
        };
        self.tagger.record_frame();
        Ok(rssi_from_reply(&reply).map(|rssi| {
            self.record_rssi(rssi);
            i32::from(rssi)
        }))
    }

    /// Change the protocol id used by [`request_rssi`](Self::request_rssi).
    pub fn set_rssi_command(&mut self, id: u8) {
        self.config.rssi_command = id;
    }

    /// Enable or disable the trailing-byte RSSI heuristic.
    pub fn set_rssi_heuristic(&mut self, enabled: bool) {
        self.config.rssi_heuristic = enabled;
    }

    /// Handle one "data ready" edge.
    ///
    /// Pulls one frame, decodes it, and fans it out: raw text and raw bytes
    /// sinks first, then the RSSI heuristic, then the typed sink matching the
    /// packet. Never panics and always leaves the session ready for the next
    /// edge.
    pub fn dispatch(&mut self) -> DispatchOutcome {
        match self.pull() {
            Pulled::Empty => DispatchOutcome::Empty,
            Pulled::Failed(message) => {
                self.sinks.notify_error(&message);
                DispatchOutcome::Failed
            }
            Pulled::Frame(delivery) => match delivery.deliver(&self.sinks) {
                Ok(packet) => DispatchOutcome::Delivered(packet),
                Err(panic) => {
                    self.report(&SessionError::SinkPanicked(panic));
                    DispatchOutcome::Failed
                }
            },
        }
    }

    /// Exchange and decode one frame without calling any sink.
    ///
    /// A failed exchange is latched here; the error sink is left to the
    /// caller.
    pub(crate) fn pull(&mut self) -> Pulled {
        self.stats.edges = self.stats.edges.wrapping_add(1);

        let payload = match self.transport.receive_raw() {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.stats.empty_edges = self.stats.empty_edges.wrapping_add(1);
                return Pulled::Empty;
            }
            Err(err) => return Pulled::Failed(self.latch_failure(&err.into())),
        };

        self.tagger.record_frame();
        let received_at = self.clock.now_millis();
        let packet = decode_packet(&payload);
        debug!(kind = packet.kind(), len = payload.len(), "frame received");

        let rssi = if self.config.rssi_heuristic {
            rssi_from_trailing_byte(&payload)
        } else {
            None
        };
        if let Some(rssi) = rssi {
            self.state.latch_rssi(rssi);
            debug!(rssi, "rssi sample");
        }

        Pulled::Frame(Delivery {
            payload,
            packet,
            received_at,
            rssi,
        })
    }

    /// Shared handle on the registered sinks.
    pub(crate) fn sinks(&self) -> SinkRegistry {
        self.sinks.clone()
    }

    /// Register the handler for every received payload, as lossy UTF-8 text.
    pub fn on_message(&mut self, sink: impl FnMut(&str, u32) + Send + 'static) {
        self.sinks.set(|s| s.message = Some(Box::new(sink)));
    }

    /// Register the handler for every received payload, as raw bytes.
    pub fn on_message_buffer(&mut self, sink: impl FnMut(&[u8], u32) + Send + 'static) {
        self.sinks.set(|s| s.message_buffer = Some(Box::new(sink)));
    }

    /// Register the handler for latched errors.
    pub fn on_error(&mut self, sink: impl FnMut(&str) + Send + 'static) {
        self.sinks.set(|s| s.error = Some(Box::new(sink)));
    }

    /// Register the handler for RSSI samples.
    pub fn on_rssi(&mut self, sink: impl FnMut(i32) + Send + 'static) {
        self.sinks.set(|s| s.rssi = Some(Box::new(sink)));
    }

    /// Register the handler for `Number` packets.
    pub fn on_number(&mut self, sink: impl FnMut(i32, u32) + Send + 'static) {
        self.sinks.set(|s| s.number = Some(Box::new(sink)));
    }

    /// Register the handler for `String` packets.
    pub fn on_string(&mut self, sink: impl FnMut(&str, u32) + Send + 'static) {
        self.sinks.set(|s| s.string = Some(Box::new(sink)));
    }

    /// Register the handler for `Value` packets.
    pub fn on_value(&mut self, sink: impl FnMut(&str, i32, u32) + Send + 'static) {
        self.sinks.set(|s| s.value = Some(Box::new(sink)));
    }

    /// Remove the handler for one category.
    pub fn clear_sink(&mut self, kind: SinkKind) {
        self.sinks.clear(kind);
    }

    /// Whether a handler is registered for `kind`.
    pub fn has_sink(&self, kind: SinkKind) -> bool {
        self.sinks.is_registered(kind)
    }

    /// Last RSSI sample, or `-999` if none has been seen.
    pub fn last_rssi(&self) -> i32 {
        self.state.last_rssi()
    }

    /// Last latched error message, or an empty string.
    pub fn last_error(&self) -> String {
        self.state.last_error().to_string()
    }

    pub fn clear_last_error(&mut self) {
        self.state.clear_error();
    }

    /// Snapshot of the session counters.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            tx_serial: self.tagger.tx_serial(),
            rx_frames: self.tagger.rx_frames(),
            ..self.stats
        }
    }

    /// Current configuration, including runtime overrides.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &DuplexTransport<B, C> {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut DuplexTransport<B, C> {
        &mut self.transport
    }

    fn send_packet(
        &mut self,
        encode: impl FnOnce(u32, u32, usize) -> radiolink_frame::Result<Bytes>,
    ) -> Result<()> {
        let timestamp = self.clock.now_millis();
        let serial = self.tagger.peek_serial();
        let payload = encode(
            timestamp,
            serial,
            self.transport.config().max_payload_size,
        )?;
        self.tagger.next_serial();
        self.transport.send(&Frame::new(TRANSMIT, payload))?;
        Ok(())
    }

    fn record_rssi(&mut self, rssi: i8) {
        self.state.latch_rssi(rssi);
        debug!(rssi, "rssi sample");
        if self.sinks.call(|s| &mut s.rssi, |sink| sink(i32::from(rssi))).is_err() {
            warn!("rssi sink panicked");
        }
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn report(&mut self, err: &SessionError) {
        let message = self.latch_failure(err);
        self.sinks.notify_error(&message);
    }

    /// Count and latch a failure, returning the message for the error sink.
    pub(crate) fn latch_failure(&mut self, err: &SessionError) -> String {
        let message = err.to_string();
        warn!(error = %message, "radio link error");
        self.stats.errors = self.stats.errors.wrapping_add(1);
        self.state.latch_error(message.clone());
        message
    }
}

/// Outcome of [`Session::pull`].
pub(crate) enum Pulled {
    Empty,
    /// The exchange failed; carries the latched message.
    Failed(String),
    Frame(Delivery),
}

/// A decoded frame waiting to be fanned out.
pub(crate) struct Delivery {
    payload: Bytes,
    packet: Packet,
    received_at: u32,
    rssi: Option<i8>,
}

impl Delivery {
    /// Call the sinks in order, stopping at the first one that panics.
    pub(crate) fn deliver(self, sinks: &SinkRegistry) -> std::result::Result<Packet, String> {
        let Self {
            payload,
            packet,
            received_at,
            rssi,
        } = self;

        sinks.call(
            |s| &mut s.message,
            |sink| sink(&String::from_utf8_lossy(&payload), received_at),
        )?;
        sinks.call(|s| &mut s.message_buffer, |sink| sink(&payload, received_at))?;
        if let Some(rssi) = rssi {
            sinks.call(|s| &mut s.rssi, |sink| sink(i32::from(rssi)))?;
        }

        match &packet {
            Packet::Number { value, .. } => {
                sinks.call(|s| &mut s.number, |sink| sink(*value, received_at))?;
            }
            Packet::String { text, .. } => {
                sinks.call(|s| &mut s.string, |sink| sink(text, received_at))?;
            }
            Packet::Value { name, value, .. } => {
                sinks.call(|s| &mut s.value, |sink| sink(name, *value, received_at))?;
            }
            Packet::Buffer { .. } | Packet::Unknown { .. } => {}
        }
        Ok(packet)
    }
}

impl<B, C> std::fmt::Debug for Session<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("tagger", &self.tagger)
            .field("state", &self.state)
            .field("sinks", &self.sinks)
            .finish()
    }
}
