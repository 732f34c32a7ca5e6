//! Protocol ids carried in byte 2 of every frame.
//!
//! The radio firmware interprets the id as a command. Only `READ` has a
//! reply that the host decodes; the others are fire-and-forget.

/// Payload is an application packet to broadcast.
pub const TRANSMIT: u8 = 0xE0;

/// Read request. The peripheral answers with its pending frame, if any.
pub const READ: u8 = 0xE1;

/// Set the radio group. Payload is a single group id byte.
pub const SET_GROUP: u8 = 0xE2;

/// Default RSSI request command.
///
/// Not standardised across radio firmware builds, so sessions let callers
/// override it at runtime.
pub const RSSI_REQUEST: u8 = 0xE3;

/// Returns a human-readable name for a protocol id.
pub fn command_name(id: u8) -> &'static str {
    match id {
        TRANSMIT => "TRANSMIT",
        READ => "READ",
        SET_GROUP => "SET_GROUP",
        RSSI_REQUEST => "RSSI_REQUEST",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_builtin_commands() {
        assert_eq!(command_name(TRANSMIT), "TRANSMIT");
        assert_eq!(command_name(READ), "READ");
        assert_eq!(command_name(SET_GROUP), "SET_GROUP");
        assert_eq!(command_name(RSSI_REQUEST), "RSSI_REQUEST");
        assert_eq!(command_name(0x10), "UNKNOWN");
    }

    #[test]
    fn read_command_matches_peripheral_firmware() {
        assert_eq!(READ, 0xE1);
    }
}
