use clap::{Args, Subcommand, ValueEnum};
use radiolink_session::SessionConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod loopback;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame into a transfer buffer.
    Encode(EncodeArgs),
    /// Decode a received transfer buffer.
    Decode(DecodeArgs),
    /// Run a session against an in-memory echoing radio.
    Loopback(LoopbackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: &SessionConfig) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format, config),
        Command::Decode(args) => decode::run(args, format),
        Command::Loopback(args) => loopback::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

/// What goes into the frame payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EncodeKind {
    /// Untyped text payload.
    Raw,
    /// `Number` packet (i32).
    Number,
    /// `String` packet.
    String,
    /// `Value` packet; name comes from `--name`.
    Value,
    /// `Buffer` packet; data is hex.
    Buffer,
    /// `SET_GROUP` command; value is the group id.
    Group,
    /// RSSI request command.
    Rssi,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Payload kind.
    pub kind: EncodeKind,
    /// Payload value (number, text, hex or group id depending on kind).
    pub value: Option<String>,
    /// Name for `value` packets.
    #[arg(long)]
    pub name: Option<String>,
    /// Packet timestamp in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub timestamp: u32,
    /// Packet serial number.
    #[arg(long, default_value_t = 1)]
    pub serial: u32,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Transfer bytes as hex (whitespace and ':' allowed).
    pub hex: String,
}

/// One message queued by `loopback --send KIND:VALUE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    Raw(String),
    Number(i32),
    String(String),
    Value(String, i32),
    Buffer(Vec<u8>),
}

pub fn parse_outgoing(input: &str) -> Result<Outgoing, String> {
    let (kind, value) = input
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:VALUE, got '{input}'"))?;
    match kind {
        "raw" => Ok(Outgoing::Raw(value.to_string())),
        "number" => value
            .parse()
            .map(Outgoing::Number)
            .map_err(|err| format!("invalid number '{value}': {err}")),
        "string" => Ok(Outgoing::String(value.to_string())),
        "value" => {
            let (name, number) = value
                .rsplit_once('=')
                .ok_or_else(|| format!("expected value:NAME=NUMBER, got '{input}'"))?;
            let number = number
                .parse()
                .map_err(|err| format!("invalid number '{number}': {err}"))?;
            Ok(Outgoing::Value(name.to_string(), number))
        }
        "buffer" => crate::output::parse_hex(value).map(Outgoing::Buffer),
        other => Err(format!(
            "unknown kind '{other}' (expected raw, number, string, value or buffer)"
        )),
    }
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Message to send each round, as KIND:VALUE (repeatable).
    #[arg(long = "send", value_name = "KIND:VALUE", value_parser = parse_outgoing)]
    pub sends: Vec<Outgoing>,
    /// Number of rounds; 0 runs until interrupted.
    #[arg(long, default_value_t = 1)]
    pub rounds: u64,
    /// Pause between rounds in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,
    /// Signal strength the simulated radio reports.
    #[arg(long, allow_hyphen_values = true)]
    pub rssi: Option<i8>,
    /// Issue an RSSI request after each round.
    #[arg(long)]
    pub request_rssi: bool,
    /// Fail the first N bus exchanges.
    #[arg(long, default_value_t = 0)]
    pub fail_next: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_messages() {
        assert_eq!(parse_outgoing("number:-5"), Ok(Outgoing::Number(-5)));
        assert_eq!(
            parse_outgoing("value:a=b=3"),
            Ok(Outgoing::Value("a=b".into(), 3))
        );
        assert_eq!(parse_outgoing("string:x:y"), Ok(Outgoing::String("x:y".into())));
        assert_eq!(parse_outgoing("buffer:0aff"), Ok(Outgoing::Buffer(vec![0x0a, 0xff])));
        assert!(parse_outgoing("double:1.5").is_err());
        assert!(parse_outgoing("number:ten").is_err());
    }
}
