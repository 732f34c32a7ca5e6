use bytes::Bytes;
use radiolink_frame::{
    encode_buffer, encode_number, encode_string, encode_value, Frame, SET_GROUP, TRANSMIT,
};
use radiolink_session::SessionConfig;
use tracing::debug;

use crate::cmd::{EncodeArgs, EncodeKind};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{parse_hex, print_transfer, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat, config: &SessionConfig) -> CliResult<i32> {
    let frame = build_frame(&args, config)?;
    let transfer = frame
        .to_transfer(config.frame_config().max_payload_size)
        .map_err(|err| frame_error("encode failed", err))?;
    debug!(
        protocol_id = frame.protocol_id,
        len = frame.payload.len(),
        "frame encoded"
    );

    print_transfer(frame.protocol_id, frame.payload.len(), &transfer, format);
    Ok(SUCCESS)
}

fn build_frame(args: &EncodeArgs, config: &SessionConfig) -> CliResult<Frame> {
    let max = config.frame_config().max_payload_size;
    let (ts, serial) = (args.timestamp, args.serial);

    let frame = match args.kind {
        EncodeKind::Raw => Frame::new(TRANSMIT, Bytes::copy_from_slice(value(args)?.as_bytes())),
        EncodeKind::Number => {
            let number = parse_number(value(args)?)?;
            Frame::new(TRANSMIT, encode_number(number, ts, serial))
        }
        EncodeKind::String => {
            let payload = encode_string(value(args)?, ts, serial, max)
                .map_err(|err| frame_error("encode failed", err))?;
            Frame::new(TRANSMIT, payload)
        }
        EncodeKind::Value => {
            let name = args
                .name
                .as_deref()
                .ok_or_else(|| CliError::usage("value packets need --name"))?;
            let number = parse_number(value(args)?)?;
            let payload = encode_value(name, number, ts, serial, max)
                .map_err(|err| frame_error("encode failed", err))?;
            Frame::new(TRANSMIT, payload)
        }
        EncodeKind::Buffer => {
            let data = parse_hex(value(args)?).map_err(CliError::usage)?;
            let payload = encode_buffer(&data, ts, serial, max)
                .map_err(|err| frame_error("encode failed", err))?;
            Frame::new(TRANSMIT, payload)
        }
        EncodeKind::Group => {
            let group: u8 = value(args)?
                .parse()
                .map_err(|err| CliError::usage(format!("invalid group id: {err}")))?;
            Frame::new(SET_GROUP, vec![group])
        }
        EncodeKind::Rssi => Frame::new(config.rssi_command, vec![0u8]),
    };
    Ok(frame)
}

fn value(args: &EncodeArgs) -> CliResult<&str> {
    args.value
        .as_deref()
        .ok_or_else(|| CliError::usage(format!("{:?} needs a value", args.kind).to_lowercase()))
}

fn parse_number(text: &str) -> CliResult<i32> {
    text.parse()
        .map_err(|err| CliError::usage(format!("invalid number '{text}': {err}")))
}

#[cfg(test)]
mod tests {
    use radiolink_frame::{decode_frame, RSSI_REQUEST};

    use super::*;
    use crate::exit::{DATA_INVALID, USAGE};

    fn args(kind: EncodeKind, value: Option<&str>) -> EncodeArgs {
        EncodeArgs {
            kind,
            value: value.map(str::to_string),
            name: None,
            timestamp: 100,
            serial: 2,
        }
    }

    #[test]
    fn number_frame_carries_header() {
        let frame = build_frame(&args(EncodeKind::Number, Some("42")), &SessionConfig::default())
            .unwrap();
        assert_eq!(frame.protocol_id, TRANSMIT);
        assert_eq!(frame.payload, encode_number(42, 100, 2));
    }

    #[test]
    fn value_needs_name() {
        let err = build_frame(&args(EncodeKind::Value, Some("1")), &SessionConfig::default())
            .unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn oversized_string_is_data_invalid() {
        let text = "s".repeat(20);
        let err = build_frame(&args(EncodeKind::String, Some(&text)), &SessionConfig::default())
            .unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn rssi_uses_configured_command() {
        let frame = build_frame(&args(EncodeKind::Rssi, None), &SessionConfig::default()).unwrap();
        assert_eq!(frame.protocol_id, RSSI_REQUEST);

        let config = SessionConfig {
            rssi_command: 0x42,
            ..SessionConfig::default()
        };
        let frame = build_frame(&args(EncodeKind::Rssi, None), &config).unwrap();
        assert_eq!(frame.protocol_id, 0x42);
    }

    #[test]
    fn raw_transfer_decodes_back() {
        let frame = build_frame(&args(EncodeKind::Raw, Some("hey")), &SessionConfig::default())
            .unwrap();
        let transfer = frame.to_transfer(24).unwrap();
        assert_eq!(decode_frame(&transfer).unwrap().as_ref(), b"hey");
    }
}
