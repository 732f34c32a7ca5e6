#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn radiolink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_radiolink"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("RADIOLINK_CONFIG")
        .output()
        .expect("radiolink should run")
}

fn temp_config(tag: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "radiolink-{tag}-{}-{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, contents).expect("config should be writable");
    path
}

#[test]
fn encode_number_prints_padded_transfer() {
    let output = radiolink(&[
        "--format", "pretty", "encode", "number", "1", "--timestamp", "0", "--serial", "1",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let hex = stdout.trim();
    assert_eq!(hex.len(), 56);
    assert!(hex.starts_with("ffaae00d00000000000100000001000000"));
}

#[test]
fn encode_oversized_value_returns_60() {
    let name = "x".repeat(30);
    let output = radiolink(&["encode", "value", "1", "--name", &name]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("payload too large"));
}

#[test]
fn decode_outputs_json_record() {
    let output = radiolink(&["--format", "json", "decode", "ffaae0020000"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"command\":\"TRANSMIT\""));
    assert!(stdout.contains("\"payload_size\":2"));
}

#[test]
fn loopback_echoes_typed_packets() {
    let output = radiolink(&[
        "--format",
        "json",
        "loopback",
        "--send",
        "string:hi",
        "--send",
        "value:temp=21",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"kind\":\"string\"") && lines[0].contains("\"detail\":\"hi\""));
    assert!(lines[1].contains("\"detail\":\"temp=21\""));
    assert!(lines[1].contains("\"serial\":2"));
}

#[test]
fn loopback_reports_injected_fault() {
    let output = radiolink(&[
        "--format",
        "json",
        "loopback",
        "--fail-next",
        "1",
        "--send",
        "number:42",
        "--send",
        "number:43",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("\"detail\":\"42\""));
    assert!(stdout.contains("\"detail\":\"43\""));
    assert!(String::from_utf8_lossy(&output.stderr).contains("injected bus fault"));
}

#[test]
fn config_file_overrides_payload_cap() {
    let path = temp_config("cap", r#"{"max_payload_size": 8}"#);
    let output = Command::new(env!("CARGO_BIN_EXE_radiolink"))
        .args(["--log-level", "error", "encode", "raw", "123456789"])
        .env("RADIOLINK_CONFIG", &path)
        .output()
        .expect("radiolink should run");
    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn unknown_config_field_is_rejected() {
    let path = temp_config("bad", r#"{"max_payload": 8}"#);
    let config = path.to_string_lossy().to_string();
    let output = radiolink(&["--config", &config, "version"]);
    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn version_prints_name() {
    let output = radiolink(&["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("radiolink "));
}
