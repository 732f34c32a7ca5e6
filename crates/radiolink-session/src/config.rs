use std::path::Path;

use radiolink_frame::{FrameConfig, MAX_PAYLOAD, RSSI_REQUEST};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Session behavior settings.
///
/// Loadable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Maximum frame payload in bytes. Values above 24 are clamped.
    pub max_payload_size: usize,
    /// Protocol id sent by `request_rssi`.
    pub rssi_command: u8,
    /// Pause between an RSSI request and the read that collects its answer.
    pub rssi_wait_ms: u32,
    /// Treat a trailing payload byte <= 200 as an RSSI sample.
    pub rssi_heuristic: bool,
    /// Radio group applied by `init`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radio_group: Option<u8>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            rssi_command: RSSI_REQUEST,
            rssi_wait_ms: 10,
            rssi_heuristic: true,
            radio_group: None,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Frame codec settings derived from this config.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size.min(MAX_PAYLOAD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_payload_size, 24);
        assert_eq!(config.rssi_command, 0xE3);
        assert!(config.rssi_heuristic);
        assert_eq!(config.radio_group, None);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{"rssi_command": 66, "radio_group": 7}"#).unwrap();
        assert_eq!(config.rssi_command, 66);
        assert_eq!(config.radio_group, Some(7));
        assert_eq!(config.rssi_wait_ms, 10);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = SessionConfig::from_json_str(r#"{"retries": 3}"#).unwrap_err();
        assert!(matches!(err, SessionError::Json(_)));
    }

    #[test]
    fn frame_config_is_clamped() {
        let config = SessionConfig {
            max_payload_size: 100,
            ..SessionConfig::default()
        };
        assert_eq!(config.frame_config().max_payload_size, 24);
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "radiolink-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"rssi_heuristic": false}"#).unwrap();
        let config = SessionConfig::from_json_file(&path).unwrap();
        assert!(!config.rssi_heuristic);
        let _ = std::fs::remove_file(&path);

        let missing = SessionConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(missing, SessionError::Io(_)));
    }
}
