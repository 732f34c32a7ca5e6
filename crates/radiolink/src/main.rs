mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use radiolink_session::SessionConfig;

use crate::cmd::Command;
use crate::exit::session_error;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "radiolink", version, about = "Framed radio link CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Session configuration file (JSON).
    #[arg(long, value_name = "PATH", env = "RADIOLINK_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = load_config(cli.config.as_deref())
        .map_err(|err| session_error("config", err))
        .and_then(|config| cmd::run(cli.command, format, &config));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> radiolink_session::Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_json_file(path),
        None => Ok(SessionConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from(["radiolink", "encode", "number", "42", "--serial", "7"])
            .expect("encode args should parse");
        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn parses_loopback_sends() {
        let cli = Cli::try_parse_from([
            "radiolink",
            "loopback",
            "--send",
            "number:1",
            "--send",
            "value:temp=21",
        ])
        .expect("loopback args should parse");
        match cli.command {
            Command::Loopback(args) => assert_eq!(args.sends.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_send_arg() {
        let err = Cli::try_parse_from(["radiolink", "loopback", "--send", "number"])
            .expect_err("missing value should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config(Some(std::path::Path::new("/nonexistent/radiolink.json")))
            .expect_err("missing file should fail");
        assert!(matches!(err, radiolink_session::SessionError::Io(_)));
    }
}
