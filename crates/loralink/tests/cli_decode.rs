#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn loralink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_loralink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("LORALINK_DATABASE")
        .output()
        .expect("loralink should run")
}

fn decode_json(payload: &str) -> (Output, serde_json::Value) {
    let database = fixture("battery.dbc");
    let output = loralink(&[
        "--format",
        "json",
        "decode",
        "--database",
        database.to_str().expect("fixture path should be utf-8"),
        payload,
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = serde_json::from_str(stdout.trim()).expect("decode should print JSON");
    (output, value)
}

#[test]
fn decode_known_message_prints_formatted_signals() {
    let (output, value) = decode_json("00000200 d2040103");

    assert!(output.status.success());
    assert_eq!(value["can_id"], 512);
    assert_eq!(value["message_name"], "Battery");
    assert_eq!(value["signals"]["Voltage"], "12.34 V");
    assert_eq!(value["signals"]["Mode"], "1 (ACTIVE)");
    assert_eq!(value["signals"]["Cells"], 3);
    assert_eq!(value["raw_data"], "d2040103");
    assert!(value.get("decode_error").is_none());
}

#[test]
fn decode_unknown_identifier_is_not_an_error() {
    let (output, value) = decode_json("00000999 0102");

    assert!(output.status.success());
    assert_eq!(value["message_name"], "Unknown (0x999)");
    assert_eq!(value["signals"], serde_json::json!({}));
    assert_eq!(value["raw_data"], "0102");
}

#[test]
fn decode_wrong_size_returns_60() {
    let (output, value) = decode_json("00000200 d204");

    assert_eq!(output.status.code(), Some(60));
    assert_eq!(value["decode_error"], "Wrong data size: 2 instead of 4 bytes");
    assert_eq!(value["raw_hex"], "00 00 02 00 D2 04");
}

#[test]
fn decode_short_payload_returns_60() {
    let (output, value) = decode_json("0102");

    assert_eq!(output.status.code(), Some(60));
    assert_eq!(value["message_name"], "Unknown");
    assert_eq!(value["error"], "Payload too short");
}

#[test]
fn decode_rejects_invalid_hex_with_usage() {
    let database = fixture("battery.dbc");
    let output = loralink(&[
        "decode",
        "--database",
        database.to_str().expect("fixture path should be utf-8"),
        "xyz",
    ]);

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn decode_missing_database_fails() {
    let output = loralink(&[
        "decode",
        "--database",
        "/nonexistent/loralink/battery.dbc",
        "0000020000000000",
    ]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed loading"));
}

#[test]
fn version_prints_package_version() {
    let output = loralink(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("loralink "));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
