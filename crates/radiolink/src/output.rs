use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use radiolink_frame::{command_name, decode_packet, Packet};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One decoded frame, flattened for display.
#[derive(Debug, Serialize)]
pub struct PacketRecord {
    pub command: &'static str,
    pub protocol_id: u8,
    pub kind: &'static str,
    pub payload_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<u32>,
    pub detail: String,
    pub payload_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<u32>,
    #[serde(skip)]
    payload: Vec<u8>,
}

impl PacketRecord {
    pub fn new(protocol_id: u8, payload: &[u8], received_at: Option<u32>) -> Self {
        let packet = decode_packet(payload);
        let header = packet.header();
        Self {
            command: command_name(protocol_id),
            protocol_id,
            kind: packet.kind(),
            payload_size: payload.len(),
            timestamp: header.map(|h| h.timestamp),
            serial: header.map(|h| h.serial),
            detail: packet_detail(&packet),
            payload_hex: to_hex(payload),
            received_at,
            payload: payload.to_vec(),
        }
    }
}

#[derive(Serialize)]
struct TransferOutput<'a> {
    command: &'static str,
    protocol_id: u8,
    payload_size: usize,
    transfer_size: usize,
    transfer_hex: &'a str,
}

pub fn print_transfer(protocol_id: u8, payload_size: usize, transfer: &[u8], format: OutputFormat) {
    let hex = to_hex(transfer);
    match format {
        OutputFormat::Json => {
            let out = TransferOutput {
                command: command_name(protocol_id),
                protocol_id,
                payload_size,
                transfer_size: transfer.len(),
                transfer_hex: &hex,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "ID", "PAYLOAD", "TRANSFER"])
                .add_row(vec![
                    command_name(protocol_id).to_string(),
                    format!("{protocol_id:#04x}"),
                    payload_size.to_string(),
                    hex,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{hex}"),
        OutputFormat::Raw => print_raw(transfer),
    }
}

pub fn print_records(records: &[PacketRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "KIND", "SIZE", "TS", "SERIAL", "DETAIL"]);
            for record in records {
                table.add_row(vec![
                    record.command.to_string(),
                    record.kind.to_string(),
                    record.payload_size.to_string(),
                    optional(record.timestamp),
                    optional(record.serial),
                    record.detail.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!(
                    "command={} kind={} size={} ts={} serial={} detail={}",
                    record.command,
                    record.kind,
                    record.payload_size,
                    optional(record.timestamp),
                    optional(record.serial),
                    record.detail
                );
            }
        }
        OutputFormat::Raw => {
            for record in records {
                print_raw(&record.payload);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Parse hex digits, ignoring whitespace, `:` separators and a `0x` prefix.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits).map_err(|err| format!("invalid hex: {err}"))
}

fn packet_detail(packet: &Packet) -> String {
    match packet {
        Packet::Number { value, .. } => value.to_string(),
        Packet::Value { name, value, .. } => format!("{name}={value}"),
        Packet::String { text, .. } => text.clone(),
        Packet::Buffer { data, .. } => to_hex(data),
        Packet::Unknown { raw } => payload_preview(raw),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn optional(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use radiolink_frame::{encode_value, TRANSMIT};

    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(to_hex(&[0xff, 0xaa, 0x00, 0x0e]), "ffaa000e");
        assert_eq!(parse_hex("0xFF AA:00 0e").unwrap(), vec![0xff, 0xaa, 0x00, 0x0e]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn record_describes_value_packet() {
        let payload = encode_value("temp", 21, 500, 9, 24).unwrap();
        let record = PacketRecord::new(TRANSMIT, &payload, Some(510));
        assert_eq!(record.command, "TRANSMIT");
        assert_eq!(record.kind, "value");
        assert_eq!(record.detail, "temp=21");
        assert_eq!(record.timestamp, Some(500));
        assert_eq!(record.serial, Some(9));

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"received_at\":510"));
        assert!(!json.contains("\"payload\":"));
    }

    #[test]
    fn unknown_payload_has_no_header_fields() {
        let record = PacketRecord::new(TRANSMIT, b"hi", None);
        assert_eq!(record.kind, "unknown");
        assert_eq!(record.detail, "hi");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("timestamp"));
        assert!(!json.contains("received_at"));
    }
}
