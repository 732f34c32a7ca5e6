//! RSSI extraction.
//!
//! Neither source is part of the framing protocol. The trailing-byte
//! heuristic misfires whenever ordinary payload data happens to end in a
//! byte <= 200, so sessions let callers switch it off.

/// Largest trailing byte still read as an RSSI sample.
pub const HEURISTIC_MAX: u8 = 200;

/// Read the final payload byte as a signed RSSI sample if it is <= 200.
pub fn rssi_from_trailing_byte(payload: &[u8]) -> Option<i8> {
    let &last = payload.last()?;
    (last <= HEURISTIC_MAX).then_some(last as i8)
}

/// Read the first byte of an RSSI request reply as a signed sample.
pub fn rssi_from_reply(payload: &[u8]) -> Option<i8> {
    payload.first().map(|b| *b as i8)
}
