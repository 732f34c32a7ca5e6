//! Fixed-size frame codec and typed packet model for SPI-attached radios.
//!
//! Every exchange on the bus is a fixed 28-byte transfer carrying one frame:
//! - 2 sync bytes (`0xFF 0xAA`)
//! - a 1-byte protocol id selecting the command
//! - a 1-byte payload length
//! - up to 24 payload bytes, zero-padded to the transfer size
//!
//! Application packets (numbers, strings, name/value pairs, raw buffers)
//! ride inside the payload of `TRANSMIT` frames. There is no checksum and no
//! acknowledgment; integrity is the caller's concern.

pub mod codec;
pub mod command;
pub mod error;
pub mod packet;

pub use codec::{
    decode_frame, encode_frame, parse_frame, Frame, FrameConfig, HEADER_SIZE, MAX_PAYLOAD, SYNC,
    TRANSFER_SIZE,
};
pub use command::{command_name, READ, RSSI_REQUEST, SET_GROUP, TRANSMIT};
pub use error::{FrameError, Result};
pub use packet::{
    decode_packet, encode_buffer, encode_number, encode_string, encode_value, Packet,
    PacketHeader, PacketType, PACKET_HEADER_SIZE,
};
