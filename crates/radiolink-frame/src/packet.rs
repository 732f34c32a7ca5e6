//! Typed application packets carried inside `TRANSMIT` frames.
//!
//! Layout (integers little-endian):
//! ```text
//! ┌──────────┬───────────────┬────────────┬──────────────────────┐
//! │ Type (1B)│ Timestamp (4B)│ Serial (4B)│ Body                 │
//! └──────────┴───────────────┴────────────┴──────────────────────┘
//!
//! Number: i32
//! Value:  i32, name length (1B), name
//! String: length (1B), text
//! Buffer: raw bytes (length implied by the frame)
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::codec::MAX_PAYLOAD;
use crate::error::{FrameError, Result};

/// Type tag + timestamp + serial.
pub const PACKET_HEADER_SIZE: usize = 9;

const NUMBER_SIZE: usize = PACKET_HEADER_SIZE + 4;
const VALUE_HEADER_SIZE: usize = PACKET_HEADER_SIZE + 4 + 1;
const STRING_HEADER_SIZE: usize = PACKET_HEADER_SIZE + 1;

/// Leading type byte of an application packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Number = 0,
    Value = 1,
    String = 2,
    Buffer = 3,
    /// Reserved; not produced or decoded by this crate.
    Double = 4,
    /// Reserved; not produced or decoded by this crate.
    DoubleValue = 5,
}

impl PacketType {
    /// Map a tag byte to a packet type.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Number),
            1 => Some(Self::Value),
            2 => Some(Self::String),
            3 => Some(Self::Buffer),
            4 => Some(Self::Double),
            5 => Some(Self::DoubleValue),
            _ => None,
        }
    }

    /// The tag byte written on the wire.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Smallest packet of this type that carries all fixed fields.
    ///
    /// `None` for the reserved types.
    pub fn min_len(self) -> Option<usize> {
        match self {
            Self::Number => Some(NUMBER_SIZE),
            Self::Value => Some(VALUE_HEADER_SIZE),
            Self::String => Some(STRING_HEADER_SIZE),
            Self::Buffer => Some(PACKET_HEADER_SIZE),
            Self::Double | Self::DoubleValue => None,
        }
    }

    /// Identify a raw packet and check it is long enough for its fixed fields.
    pub fn identify(raw: &[u8]) -> Result<(Self, PacketHeader)> {
        let Some(&tag) = raw.first() else {
            return Err(FrameError::DecodeTruncated {
                needed: PACKET_HEADER_SIZE,
                got: 0,
            });
        };
        let kind = Self::from_tag(tag).ok_or(FrameError::UnsupportedType(tag))?;
        let needed = kind.min_len().ok_or(FrameError::UnsupportedType(tag))?;
        if raw.len() < needed {
            return Err(FrameError::DecodeTruncated {
                needed,
                got: raw.len(),
            });
        }

        let header = PacketHeader {
            timestamp: read_u32_le(raw, 1),
            serial: read_u32_le(raw, 5),
        };
        Ok((kind, header))
    }
}

/// Producer-assigned fields common to every packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketHeader {
    /// Milliseconds since the producer's epoch.
    pub timestamp: u32,
    /// Producer's wrapping serial number.
    pub serial: u32,
}

/// A decoded application packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Number {
        header: PacketHeader,
        value: i32,
    },
    Value {
        header: PacketHeader,
        name: String,
        value: i32,
    },
    String {
        header: PacketHeader,
        text: String,
    },
    Buffer {
        header: PacketHeader,
        data: Bytes,
    },
    /// Unknown or reserved type, or too short for its declared type.
    Unknown {
        raw: Bytes,
    },
}

impl Packet {
    /// Short name of the packet kind, for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Number { .. } => "number",
            Packet::Value { .. } => "value",
            Packet::String { .. } => "string",
            Packet::Buffer { .. } => "buffer",
            Packet::Unknown { .. } => "unknown",
        }
    }

    /// Header fields, if the packet decoded to a known type.
    pub fn header(&self) -> Option<PacketHeader> {
        match self {
            Packet::Number { header, .. }
            | Packet::Value { header, .. }
            | Packet::String { header, .. }
            | Packet::Buffer { header, .. } => Some(*header),
            Packet::Unknown { .. } => None,
        }
    }
}

/// Encode a `Number` packet.
pub fn encode_number(value: i32, timestamp: u32, serial: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(NUMBER_SIZE);
    put_header(&mut buf, PacketType::Number, timestamp, serial);
    buf.put_i32_le(value);
    buf.freeze()
}

/// Encode a `Value` (name + number) packet.
///
/// The packet is `14 + name.len()` bytes: header, value, and the name-length
/// byte. Fails when that exceeds `max_payload`, so a 24-byte cap leaves room
/// for a 10-byte name.
pub fn encode_value(
    name: &str,
    value: i32,
    timestamp: u32,
    serial: u32,
    max_payload: usize,
) -> Result<Bytes> {
    let size = VALUE_HEADER_SIZE + name.len();
    check_size(size, max_payload)?;

    let mut buf = BytesMut::with_capacity(size);
    put_header(&mut buf, PacketType::Value, timestamp, serial);
    buf.put_i32_le(value);
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());
    Ok(buf.freeze())
}

/// Encode a `String` packet.
pub fn encode_string(text: &str, timestamp: u32, serial: u32, max_payload: usize) -> Result<Bytes> {
    let size = STRING_HEADER_SIZE + text.len();
    check_size(size, max_payload)?;

    let mut buf = BytesMut::with_capacity(size);
    put_header(&mut buf, PacketType::String, timestamp, serial);
    buf.put_u8(text.len() as u8);
    buf.put_slice(text.as_bytes());
    Ok(buf.freeze())
}

/// Encode a `Buffer` packet. The body has no length prefix.
pub fn encode_buffer(
    data: &[u8],
    timestamp: u32,
    serial: u32,
    max_payload: usize,
) -> Result<Bytes> {
    let size = PACKET_HEADER_SIZE + data.len();
    check_size(size, max_payload)?;

    let mut buf = BytesMut::with_capacity(size);
    put_header(&mut buf, PacketType::Buffer, timestamp, serial);
    buf.put_slice(data);
    Ok(buf.freeze())
}

/// Decode a frame payload into a typed packet.
///
/// Never fails: anything that cannot be decoded becomes [`Packet::Unknown`].
/// Inline length bytes are clamped to the bytes actually present.
pub fn decode_packet(raw: &[u8]) -> Packet {
    let (kind, header) = match PacketType::identify(raw) {
        Ok(identified) => identified,
        Err(err) => {
            trace!(%err, len = raw.len(), "packet decoded as unknown");
            return Packet::Unknown {
                raw: Bytes::copy_from_slice(raw),
            };
        }
    };

    match kind {
        PacketType::Number => Packet::Number {
            header,
            value: read_i32_le(raw, PACKET_HEADER_SIZE),
        },
        PacketType::Value => {
            let value = read_i32_le(raw, PACKET_HEADER_SIZE);
            let name = clamped_text(raw, PACKET_HEADER_SIZE + 4);
            Packet::Value {
                header,
                name,
                value,
            }
        }
        PacketType::String => Packet::String {
            header,
            text: clamped_text(raw, PACKET_HEADER_SIZE),
        },
        PacketType::Buffer => Packet::Buffer {
            header,
            data: Bytes::copy_from_slice(&raw[PACKET_HEADER_SIZE..]),
        },
        // `identify` rejects the reserved types.
        PacketType::Double | PacketType::DoubleValue => Packet::Unknown {
            raw: Bytes::copy_from_slice(raw),
        },
    }
}

fn check_size(size: usize, max_payload: usize) -> Result<()> {
    let max = max_payload.min(MAX_PAYLOAD);
    if size > max {
        return Err(FrameError::PayloadTooLarge { size, max });
    }
    Ok(())
}

fn put_header(buf: &mut BytesMut, kind: PacketType, timestamp: u32, serial: u32) {
    buf.put_u8(kind.tag());
    buf.put_u32_le(timestamp);
    buf.put_u32_le(serial);
}

/// Read a length-prefixed string at `len_offset`, clamping to the buffer.
fn clamped_text(raw: &[u8], len_offset: usize) -> String {
    let start = len_offset + 1;
    let declared = raw[len_offset] as usize;
    let len = declared.min(raw.len() - start);
    String::from_utf8_lossy(&raw[start..start + len]).into_owned()
}

fn read_u32_le(raw: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        raw[offset],
        raw[offset + 1],
        raw[offset + 2],
        raw[offset + 3],
    ])
}

fn read_i32_le(raw: &[u8], offset: usize) -> i32 {
    read_u32_le(raw, offset) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_roundtrip() {
        for (value, ts, serial) in [
            (0, 0, 0),
            (42, 1_000, 7),
            (-1, u32::MAX, u32::MAX),
            (i32::MIN, 12, 0xDEAD_BEEF),
            (i32::MAX, 99, 1),
        ] {
            let raw = encode_number(value, ts, serial);
            assert_eq!(raw.len(), 13);
            assert_eq!(
                decode_packet(&raw),
                Packet::Number {
                    header: PacketHeader {
                        timestamp: ts,
                        serial
                    },
                    value
                }
            );
        }
    }

    #[test]
    fn number_wire_layout() {
        let raw = encode_number(-2, 0x0403_0201, 0x0807_0605);
        assert_eq!(
            raw.as_ref(),
            &[0, 1, 2, 3, 4, 5, 6, 7, 8, 0xFE, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn value_roundtrip() {
        let raw = encode_value("temp", -40, 500, 3, MAX_PAYLOAD).unwrap();
        assert_eq!(raw[0], PacketType::Value.tag());
        assert_eq!(raw[13], 4);
        assert_eq!(
            decode_packet(&raw),
            Packet::Value {
                header: PacketHeader {
                    timestamp: 500,
                    serial: 3
                },
                name: "temp".to_string(),
                value: -40
            }
        );
    }

    #[test]
    fn value_fills_cap_exactly() {
        let name = "n".repeat(MAX_PAYLOAD - VALUE_HEADER_SIZE);
        let raw = encode_value(&name, 1, 0, 0, MAX_PAYLOAD).unwrap();
        assert_eq!(raw.len(), MAX_PAYLOAD);

        assert_eq!(name.len(), 10);
        assert_eq!(raw[13], 10);
    }

    #[test]
    fn value_oversized_name_rejected() {
        let err = encode_value(&"x".repeat(30), 1, 0, 0, MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));

        let err = encode_value(&"x".repeat(11), 1, 0, 0, MAX_PAYLOAD).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLarge { size: 25, max: 24 });
    }

    #[test]
    fn string_roundtrip() {
        let raw = encode_string("hello radio", 77, 9, MAX_PAYLOAD).unwrap();
        assert_eq!(raw.len(), 10 + 11);
        assert_eq!(
            decode_packet(&raw),
            Packet::String {
                header: PacketHeader {
                    timestamp: 77,
                    serial: 9
                },
                text: "hello radio".to_string()
            }
        );
    }

    #[test]
    fn string_oversized_rejected() {
        assert!(encode_string(&"s".repeat(14), 0, 0, MAX_PAYLOAD).is_ok());
        let err = encode_string(&"s".repeat(15), 0, 0, MAX_PAYLOAD).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLarge { size: 25, max: 24 });
    }

    #[test]
    fn smaller_cap_applies() {
        let err = encode_string("abc", 0, 0, 12).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLarge { size: 13, max: 12 });
    }

    #[test]
    fn buffer_roundtrip() {
        let raw = encode_buffer(&[9, 8, 7], 1, 2, MAX_PAYLOAD).unwrap();
        assert_eq!(raw.len(), 12);
        assert_eq!(
            decode_packet(&raw),
            Packet::Buffer {
                header: PacketHeader {
                    timestamp: 1,
                    serial: 2
                },
                data: Bytes::from_static(&[9, 8, 7])
            }
        );
        assert!(encode_buffer(&[0u8; 16], 0, 0, MAX_PAYLOAD).is_err());
    }

    #[test]
    fn string_prefixes_never_panic() {
        let raw = encode_string("truncate me", 5, 6, MAX_PAYLOAD).unwrap();
        for cut in 0..=raw.len() {
            match decode_packet(&raw[..cut]) {
                Packet::String { header, text } => {
                    assert!(cut >= STRING_HEADER_SIZE);
                    assert_eq!(header.serial, 6);
                    assert_eq!(text, &"truncate me"[..cut - STRING_HEADER_SIZE]);
                }
                Packet::Unknown { raw } => {
                    assert!(cut < STRING_HEADER_SIZE);
                    assert_eq!(raw.len(), cut);
                }
                other => panic!("unexpected packet {other:?}"),
            }
        }
    }

    #[test]
    fn value_prefixes_never_panic() {
        let raw = encode_value("speed", 123, 5, 6, MAX_PAYLOAD).unwrap();
        for cut in 0..=raw.len() {
            match decode_packet(&raw[..cut]) {
                Packet::Value { name, value, .. } => {
                    assert!(cut >= VALUE_HEADER_SIZE);
                    assert_eq!(value, 123);
                    assert_eq!(name, &"speed"[..cut - VALUE_HEADER_SIZE]);
                }
                Packet::Unknown { .. } => assert!(cut < VALUE_HEADER_SIZE),
                other => panic!("unexpected packet {other:?}"),
            }
        }
    }

    #[test]
    fn short_number_is_unknown() {
        let raw = encode_number(5, 0, 0);
        assert!(matches!(decode_packet(&raw[..12]), Packet::Unknown { .. }));
    }

    #[test]
    fn reserved_and_unknown_tags() {
        let mut raw = encode_number(5, 0, 0).to_vec();
        raw[0] = PacketType::Double.tag();
        assert!(matches!(decode_packet(&raw), Packet::Unknown { .. }));
        raw[0] = PacketType::DoubleValue.tag();
        assert!(matches!(decode_packet(&raw), Packet::Unknown { .. }));
        raw[0] = 0x7F;
        assert!(matches!(decode_packet(&raw), Packet::Unknown { .. }));

        assert_eq!(
            PacketType::identify(&raw).unwrap_err(),
            FrameError::UnsupportedType(0x7F)
        );
        assert_eq!(PacketType::from_tag(4), Some(PacketType::Double));
        assert_eq!(PacketType::from_tag(5), Some(PacketType::DoubleValue));
    }

    #[test]
    fn identify_reports_truncation() {
        assert_eq!(
            PacketType::identify(&[]).unwrap_err(),
            FrameError::DecodeTruncated { needed: 9, got: 0 }
        );
        assert_eq!(
            PacketType::identify(&[0, 1, 2]).unwrap_err(),
            FrameError::DecodeTruncated { needed: 13, got: 3 }
        );
    }

    #[test]
    fn lossy_text_rendering() {
        let mut raw = encode_string("ab", 0, 0, MAX_PAYLOAD).unwrap().to_vec();
        raw[10] = 0xFF;
        match decode_packet(&raw) {
            Packet::String { text, .. } => assert_eq!(text, "\u{FFFD}b"),
            other => panic!("unexpected packet {other:?}"),
        }
    }
}
