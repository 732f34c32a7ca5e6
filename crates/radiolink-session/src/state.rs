use serde::Serialize;

/// Value reported by `last_rssi` before any sample has been seen.
pub const NO_RSSI: i32 = -999;

/// Latched link observations, readable at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    last_error: Option<String>,
    last_rssi: Option<i8>,
}

impl LinkState {
    pub fn latch_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    pub fn latch_rssi(&mut self, rssi: i8) {
        self.last_rssi = Some(rssi);
    }

    /// Last error message, or an empty string.
    pub fn last_error(&self) -> &str {
        self.last_error.as_deref().unwrap_or("")
    }

    /// Last RSSI sample, or [`NO_RSSI`].
    pub fn last_rssi(&self) -> i32 {
        self.last_rssi.map_or(NO_RSSI, i32::from)
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Counters describing session traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Last serial stamped on an outgoing packet.
    pub tx_serial: u32,
    /// Frames received (wrapping).
    pub rx_frames: u32,
    /// Edges handled by the dispatcher.
    pub edges: u64,
    /// Edges that produced no frame.
    pub empty_edges: u64,
    /// Operations that latched an error.
    pub errors: u64,
}
