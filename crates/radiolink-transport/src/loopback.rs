//! In-memory collaborators for tests, demos and host-side simulation.
//!
//! [`LoopbackBus`] behaves like a radio peripheral whose transmitter is
//! wired to its own receiver: every `TRANSMIT` payload is queued and handed
//! back on the next `READ` exchange. Handles are cheap clones sharing state,
//! so a test can keep one while the session owns another.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use radiolink_frame::{
    decode_frame, encode_frame, HEADER_SIZE, MAX_PAYLOAD, READ, RSSI_REQUEST, SET_GROUP, TRANSMIT,
};
use tracing::trace;

use crate::traits::{ChipSelect, DuplexBus, EdgeCallback, SignalSource};

#[derive(Debug)]
struct LoopbackState {
    pending: VecDeque<Bytes>,
    sent: Vec<Vec<u8>>,
    fail_remaining: usize,
    echo: bool,
    rssi: Option<i8>,
    rssi_command: u8,
    group: Option<u8>,
}

/// A duplex bus backed by an in-memory radio.
#[derive(Debug, Clone)]
pub struct LoopbackBus {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackBus {
    /// Create a loopback radio that echoes transmitted packets.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoopbackState {
                pending: VecDeque::new(),
                sent: Vec::new(),
                fail_remaining: 0,
                echo: true,
                rssi: None,
                rssi_command: RSSI_REQUEST,
                group: None,
            })),
        }
    }

    /// Answer RSSI requests with `rssi`.
    pub fn with_rssi(self, rssi: i8) -> Self {
        self.lock().rssi = Some(rssi);
        self
    }

    /// Queue a payload as if the radio had received it over the air.
    pub fn inject(&self, payload: impl Into<Bytes>) {
        self.lock().pending.push_back(payload.into());
    }

    /// Fail the next `count` exchanges.
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_remaining = count;
    }

    /// Enable or disable echoing of transmitted payloads.
    pub fn set_echo(&self, echo: bool) {
        self.lock().echo = echo;
    }

    /// Protocol id this radio treats as an RSSI request.
    pub fn set_rssi_command(&self, id: u8) {
        self.lock().rssi_command = id;
    }

    /// Every transfer buffer clocked out successfully, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Payloads waiting for a `READ`.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Last radio group set via `SET_GROUP`.
    pub fn group(&self) -> Option<u8> {
        self.lock().group
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplexBus for LoopbackBus {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        let mut state = self.lock();
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return Err(io::Error::other("injected bus fault"));
        }

        state.sent.push(tx.to_vec());
        rx.fill(0);

        if tx.len() < HEADER_SIZE {
            return Ok(());
        }
        let command = tx[2];
        let payload = decode_frame(tx).unwrap_or_default();

        // The RSSI command is configurable and may shadow a fixed id.
        if command == state.rssi_command {
            if let Some(rssi) = state.rssi {
                state.pending.push_front(Bytes::copy_from_slice(&[rssi as u8]));
            }
        } else if command == READ {
            if let Some(reply) = state.pending.pop_front() {
                write_reply(&reply, rx);
            }
        } else if command == TRANSMIT {
            if state.echo {
                state.pending.push_back(payload);
            }
        } else if command == SET_GROUP {
            state.group = payload.first().copied();
        } else {
            trace!(command, "loopback ignoring command");
        }
        Ok(())
    }
}

fn write_reply(payload: &[u8], rx: &mut [u8]) {
    let capacity = rx.len().saturating_sub(HEADER_SIZE).min(MAX_PAYLOAD);
    let payload = &payload[..payload.len().min(capacity)];
    let mut wire = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    if encode_frame(TRANSMIT, payload, MAX_PAYLOAD, &mut wire).is_ok() {
        rx[..wire.len()].copy_from_slice(&wire);
    }
}

/// Chip-select line that records every transition (`true` = asserted).
#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    transitions: Arc<Mutex<Vec<bool>>>,
}

impl RecordingPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<bool> {
        self.lock().clone()
    }

    pub fn is_asserted(&self) -> bool {
        self.lock().last().copied().unwrap_or(false)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<bool>> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChipSelect for RecordingPin {
    fn assert(&mut self) -> io::Result<()> {
        self.lock().push(true);
        Ok(())
    }

    fn deassert(&mut self) -> io::Result<()> {
        self.lock().push(false);
        Ok(())
    }
}

/// "Data ready" line pulsed by hand.
#[derive(Clone, Default)]
pub struct EdgeLine {
    callback: Arc<Mutex<Option<EdgeCallback>>>,
}

impl EdgeLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one edge. Returns `false` when no callback is registered.
    ///
    /// The callback runs without the line's lock held, so it may pulse
    /// again; nested pulses find the slot empty and are dropped.
    pub fn pulse(&self) -> bool {
        let taken = self.slot().take();
        let Some(mut callback) = taken else {
            return false;
        };
        callback();

        let mut slot = self.slot();
        if slot.is_none() {
            *slot = Some(callback);
        }
        true
    }

    pub fn is_attached(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<EdgeCallback>> {
        self.callback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SignalSource for EdgeLine {
    fn on_edge(&mut self, callback: EdgeCallback) {
        *self.slot() = Some(callback);
    }
}

impl std::fmt::Debug for EdgeLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeLine")
            .field("attached", &self.is_attached())
            .finish()
    }
}
