use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use loralink_packet::DeviceState;
use loralink_session::{SessionStats, StatusReport, TelemetryRecord};
use loralink_signals::DecodedTelemetry;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

const NO_REPLY: &str = "(no reply)";

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_status(report: &StatusReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SECTION", "FIELD", "VALUE"]);
            add_section(&mut table, "settings", report.settings_rows());
            add_section(&mut table, "gps", report.gps_rows());
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let settings = report.settings_rows();
            let gps = report.gps_rows();
            println!("Settings:");
            print_pretty_section(&settings);
            println!("GPS:");
            print_pretty_section(&gps);
        }
    }
}

fn add_section(table: &mut Table, section: &str, rows: Vec<(&'static str, String)>) {
    if rows.is_empty() {
        table.add_row(vec![section, "-", NO_REPLY]);
        return;
    }
    for (label, value) in rows {
        table.add_row(vec![section.to_string(), label.to_string(), value]);
    }
}

fn print_pretty_section(rows: &[(&'static str, String)]) {
    if rows.is_empty() {
        println!("  {NO_REPLY}");
        return;
    }
    for (label, value) in rows {
        println!("  {label}: {value}");
    }
}

pub fn print_telemetry(record: &TelemetryRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            let mut table = new_table(vec!["TIME", "RSSI", "SNR", "ID", "MESSAGE", "SIGNALS"]);
            table.add_row(vec![
                format!("{:.3}", record.timestamp),
                record.rssi.to_string(),
                record.snr.to_string(),
                can_id_text(&record.telemetry),
                record.telemetry.message_name.clone(),
                signals_text(&record.telemetry),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut flags = String::new();
            if record.crc_error {
                flags.push_str(" crc_error");
            }
            if record.general_error {
                flags.push_str(" general_error");
            }
            println!(
                "[{:.3}] rssi={} snr={}{} {} {}: {}",
                record.timestamp,
                record.rssi,
                record.snr,
                flags,
                can_id_text(&record.telemetry),
                record.telemetry.message_name,
                signals_text(&record.telemetry)
            );
        }
    }
}

pub fn print_decoded(decoded: &DecodedTelemetry, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(decoded),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SIGNAL", "VALUE"]);
            for reading in &decoded.signals {
                table.add_row(vec![reading.name.clone(), reading.value.to_string()]);
            }
            println!(
                "{} {}",
                can_id_text(decoded),
                decoded.message_name
            );
            println!("{table}");
            if let Some(problem) = problem_text(decoded) {
                println!("error: {problem}");
            }
        }
        OutputFormat::Pretty => {
            println!(
                "{} {}: {}",
                can_id_text(decoded),
                decoded.message_name,
                signals_text(decoded)
            );
        }
    }
}

#[derive(Serialize)]
struct ActionOutput<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_size: Option<usize>,
    stats: SessionStats,
}

pub fn print_transmitted(payload_size: usize, stats: SessionStats, format: OutputFormat) {
    let out = ActionOutput {
        action: "transmit",
        state: None,
        payload_size: Some(payload_size),
        stats,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ACTION", "SIZE", "PACKETS SENT"]);
            table.add_row(vec![
                "transmit".to_string(),
                payload_size.to_string(),
                stats.transmitted.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("transmitted {payload_size} bytes"),
    }
}

pub fn print_state_changed(state: DeviceState, stats: SessionStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ActionOutput {
            action: "state",
            state: Some(state),
            payload_size: None,
            stats,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ACTION", "STATE"]);
            table.add_row(vec!["state".to_string(), state.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("device state set to {state}"),
    }
}

fn can_id_text(decoded: &DecodedTelemetry) -> String {
    decoded
        .can_id
        .map(|id| format!("0x{id:X}"))
        .unwrap_or_else(|| "-".to_string())
}

fn signals_text(decoded: &DecodedTelemetry) -> String {
    if let Some(problem) = problem_text(decoded) {
        return format!("<{problem}>");
    }
    if decoded.signals.is_empty() {
        return format!("raw={}", decoded.raw_data);
    }
    decoded
        .signals
        .iter()
        .map(|reading| format!("{}={}", reading.name, reading.value))
        .collect::<Vec<_>>()
        .join(", ")
}

fn problem_text(decoded: &DecodedTelemetry) -> Option<&str> {
    decoded
        .error
        .as_deref()
        .or(decoded.decode_error.as_deref())
}
