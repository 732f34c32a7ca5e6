use bytes::{BufMut, Bytes, BytesMut};

use crate::command::READ;
use crate::error::{FrameError, Result};

/// Frame header: sync (2) + protocol id (1) + length (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Sync bytes that open every frame.
pub const SYNC: [u8; 2] = [0xFF, 0xAA];

/// Size of every duplex exchange on the bus.
pub const TRANSFER_SIZE: usize = 28;

/// Largest payload that fits a single transfer.
pub const MAX_PAYLOAD: usize = TRANSFER_SIZE - HEADER_SIZE;

/// A frame addressed to a protocol id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command selector (see [`crate::command`]).
    pub protocol_id: u8,
    /// The frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(protocol_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            protocol_id,
            payload: payload.into(),
        }
    }

    /// The empty `READ` frame used to poll the peripheral.
    pub fn read_request() -> Self {
        Self::new(READ, Bytes::new())
    }

    /// The unpadded wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode this frame into a zero-padded transfer buffer.
    pub fn to_transfer(&self, max_payload: usize) -> Result<[u8; TRANSFER_SIZE]> {
        let mut wire = BytesMut::with_capacity(TRANSFER_SIZE);
        encode_frame(self.protocol_id, &self.payload, max_payload, &mut wire)?;

        let mut transfer = [0u8; TRANSFER_SIZE];
        transfer[..wire.len()].copy_from_slice(&wire);
        Ok(transfer)
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬─────────────┬──────────┬──────────────────┐
/// │ Sync (2B) │ Protocol id │ Length   │ Payload          │
/// │ 0xFF 0xAA │ (1B)        │ (1B)     │ (Length bytes)   │
/// └───────────┴─────────────┴──────────┴──────────────────┘
/// ```
///
/// `max_payload` is clamped to [`MAX_PAYLOAD`]; a larger cap cannot be
/// carried by one transfer.
pub fn encode_frame(
    protocol_id: u8,
    payload: &[u8],
    max_payload: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    let max = max_payload.min(MAX_PAYLOAD);
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&SYNC);
    dst.put_u8(protocol_id);
    dst.put_u8(payload.len() as u8);
    dst.put_slice(payload);
    Ok(())
}

/// Parse a frame out of a received transfer buffer.
///
/// The declared length is clamped to the bytes actually exchanged, so a
/// peer reporting more than it sent cannot cause an over-read. Returns
/// `None` when the buffer is shorter than the header or the clamped length
/// is zero. Sync bytes are not validated.
pub fn parse_frame(raw: &[u8]) -> Option<Frame> {
    if raw.len() < HEADER_SIZE {
        return None;
    }

    let declared = raw[3] as usize;
    let len = declared.min(raw.len() - HEADER_SIZE);
    if len == 0 {
        return None;
    }

    Some(Frame {
        protocol_id: raw[2],
        payload: Bytes::copy_from_slice(&raw[HEADER_SIZE..HEADER_SIZE + len]),
    })
}

/// Decode the payload of a received transfer buffer.
pub fn decode_frame(raw: &[u8]) -> Option<Bytes> {
    parse_frame(raw).map(|frame| frame.payload)
}

/// Configuration for the frame codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 24 (the transfer capacity).
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
        }
    }
}
