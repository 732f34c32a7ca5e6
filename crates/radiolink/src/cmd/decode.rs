use radiolink_frame::{parse_frame, HEADER_SIZE};

use crate::cmd::DecodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{parse_hex, print_records, OutputFormat, PacketRecord};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let record = decode_hex(&args.hex)?;
    print_records(&[record], format);
    Ok(SUCCESS)
}

fn decode_hex(hex: &str) -> CliResult<PacketRecord> {
    let raw = parse_hex(hex).map_err(CliError::usage)?;
    if raw.len() < HEADER_SIZE {
        return Err(CliError::new(
            DATA_INVALID,
            format!("need at least {HEADER_SIZE} bytes, got {}", raw.len()),
        ));
    }
    let frame = parse_frame(&raw)
        .ok_or_else(|| CliError::new(DATA_INVALID, "frame carries no payload"))?;
    Ok(PacketRecord::new(frame.protocol_id, &frame.payload, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::to_hex;
    use radiolink_frame::{encode_number, Frame, TRANSMIT};

    #[test]
    fn decodes_number_transfer() {
        let transfer = Frame::new(TRANSMIT, encode_number(-7, 1234, 3))
            .to_transfer(24)
            .unwrap();
        let record = decode_hex(&to_hex(&transfer)).unwrap();
        assert_eq!(record.kind, "number");
        assert_eq!(record.detail, "-7");
        assert_eq!(record.timestamp, Some(1234));
        assert_eq!(record.serial, Some(3));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let err = decode_hex("ffaae100").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        let err = decode_hex("ffaa").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
