use std::fmt::{self, Write as _};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::database::{SignalDatabase, SignalValue};

/// Bytes of big-endian CAN identifier at the head of every telemetry payload.
pub const IDENTIFIER_LEN: usize = 4;

const PAYLOAD_TOO_SHORT: &str = "Payload too short";

/// A signal value ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormattedValue {
    Integer(i128),
    Float(f64),
    Text(String),
}

impl fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write_float(f, *value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

// Shortest round-trip digits. Magnitudes from 1e16 up, and below 1e-4, use
// an exponent with an explicit sign and at least two digits (`1e+16`,
// `2.5e-05`); integral values otherwise keep a trailing `.0`.
fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return f.write_str("nan");
    }
    if value.is_infinite() {
        return f.write_str(if value > 0.0 { "inf" } else { "-inf" });
    }

    let magnitude = value.abs();
    if value != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{value:e}");
        let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return write!(f, "{mantissa}e{sign}{digits:0>2}");
    }

    let text = value.to_string();
    f.write_str(&text)?;
    if !text.contains('.') {
        f.write_str(".0")?;
    }
    Ok(())
}

/// One named, formatted signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalReading {
    pub name: String,
    pub value: FormattedValue,
}

/// Result of decoding one telemetry payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedTelemetry {
    /// Absent only when the payload was too short to hold an identifier.
    pub can_id: Option<u32>,
    pub message_name: String,
    /// Signals in database order; serialized as a JSON object.
    #[serde(serialize_with = "serialize_signals")]
    pub signals: Vec<SignalReading>,
    /// Lowercase hex of the data bytes after the identifier.
    pub raw_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    /// Space-separated uppercase hex of the whole payload, set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn serialize_signals<S: Serializer>(
    signals: &[SignalReading],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(signals.iter().map(|reading| (&reading.name, &reading.value)))
}

impl DecodedTelemetry {
    /// Look up a formatted signal by name.
    pub fn signal(&self, name: &str) -> Option<&FormattedValue> {
        self.signals
            .iter()
            .find(|reading| reading.name == name)
            .map(|reading| &reading.value)
    }

    /// True when the payload was decoded without any error.
    pub fn is_ok(&self) -> bool {
        self.decode_error.is_none() && self.error.is_none()
    }
}

/// Decodes telemetry payloads against a shared signal database.
#[derive(Debug, Clone, Default)]
pub struct TelemetryDecoder {
    database: Arc<SignalDatabase>,
}

impl TelemetryDecoder {
    pub fn new(database: SignalDatabase) -> Self {
        Self {
            database: Arc::new(database),
        }
    }

    pub fn from_shared(database: Arc<SignalDatabase>) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &SignalDatabase {
        &self.database
    }

    /// Decode `payload`: 4-byte big-endian identifier followed by data bytes.
    ///
    /// Never fails; problems are reported in the returned value's
    /// `error` / `decode_error` fields.
    pub fn decode_payload(&self, payload: &[u8]) -> DecodedTelemetry {
        if payload.len() < IDENTIFIER_LEN {
            debug!(len = payload.len(), "telemetry payload too short");
            return DecodedTelemetry {
                can_id: None,
                message_name: "Unknown".to_string(),
                signals: Vec::new(),
                raw_data: String::new(),
                decode_error: None,
                raw_hex: Some(upper_hex_spaced(payload)),
                error: Some(PAYLOAD_TOO_SHORT.to_string()),
            };
        }

        let (head, data) = payload.split_at(IDENTIFIER_LEN);
        let identifier = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
        let mut decoded = DecodedTelemetry {
            can_id: Some(identifier),
            message_name: String::new(),
            signals: Vec::new(),
            raw_data: lower_hex(data),
            decode_error: None,
            raw_hex: None,
            error: None,
        };

        let Some(schema) = self.database.lookup(identifier) else {
            decoded.message_name = format!("Unknown (0x{identifier:X})");
            return decoded;
        };
        decoded.message_name = schema.name.clone();

        match schema.decode(data) {
            Ok(values) => {
                decoded.signals = values
                    .into_iter()
                    .map(|(name, value)| {
                        let unit = schema.signal(&name).and_then(|signal| signal.unit.as_deref());
                        let value = format_value(&value, unit);
                        SignalReading { name, value }
                    })
                    .collect();
            }
            Err(err) => {
                warn!(
                    can_id = identifier,
                    message_name = %schema.name,
                    error = %err,
                    "telemetry decode failed"
                );
                decoded.decode_error = Some(err.to_string());
                decoded.raw_hex = Some(upper_hex_spaced(payload));
            }
        }

        decoded
    }
}

/// Format a decoded value for display.
///
/// Floats are rounded to two decimals, enumerated values render as
/// `"<raw> (<name>)"`, and a unit not already present in the text is appended.
pub fn format_value(value: &SignalValue, unit: Option<&str>) -> FormattedValue {
    let formatted = match value {
        SignalValue::Integer(value) => FormattedValue::Integer(*value),
        SignalValue::Float(value) => FormattedValue::Float(round_hundredths(*value)),
        SignalValue::Enumerated { raw, name } => FormattedValue::Text(format!("{raw} ({name})")),
    };

    match unit {
        Some(unit) if !unit.is_empty() => {
            let text = formatted.to_string();
            if text.contains(unit) {
                formatted
            } else {
                FormattedValue::Text(format!("{text} {unit}"))
            }
        }
        _ => formatted,
    }
}

// Decimal rounding of the exact binary value.
fn round_hundredths(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

fn lower_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn upper_hex_spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::database::{MessageSchema, SignalDefinition};

    fn decoder() -> TelemetryDecoder {
        let mut mode = SignalDefinition::new("Mode", 16, 8);
        mode.choices = BTreeMap::from([(0, "IDLE".to_string()), (1, "ACTIVE".to_string())]);

        let database = SignalDatabase::from_messages([MessageSchema {
            identifier: 0x100,
            name: "Battery".to_string(),
            length: 4,
            signals: vec![
                SignalDefinition {
                    factor: 0.01,
                    unit: Some("V".to_string()),
                    ..SignalDefinition::new("Voltage", 0, 16)
                },
                mode,
                SignalDefinition {
                    unit: Some("%".to_string()),
                    ..SignalDefinition::new("Charge", 24, 8)
                },
            ],
        }])
        .unwrap();
        TelemetryDecoder::new(database)
    }

    #[test]
    fn decodes_known_message() {
        let decoded = decoder().decode_payload(&[0x00, 0x00, 0x01, 0x00, 0xB0, 0x04, 0x01, 0x5A]);

        assert!(decoded.is_ok());
        assert_eq!(decoded.can_id, Some(0x100));
        assert_eq!(decoded.message_name, "Battery");
        assert_eq!(decoded.raw_data, "b004015a");
        assert_eq!(
            decoded.signal("Voltage"),
            Some(&FormattedValue::Text("12.0 V".to_string()))
        );
        assert_eq!(
            decoded.signal("Mode"),
            Some(&FormattedValue::Text("1 (ACTIVE)".to_string()))
        );
        assert_eq!(
            decoded.signal("Charge"),
            Some(&FormattedValue::Text("90 %".to_string()))
        );
    }

    #[test]
    fn too_short_payload() {
        let decoded = decoder().decode_payload(&[0x01, 0x02]);
        assert_eq!(decoded.error.as_deref(), Some("Payload too short"));
        assert_eq!(decoded.message_name, "Unknown");
        assert_eq!(decoded.can_id, None);
        assert_eq!(decoded.raw_hex.as_deref(), Some("01 02"));

        let empty = decoder().decode_payload(&[]);
        assert_eq!(empty.error.as_deref(), Some("Payload too short"));
    }

    #[test]
    fn unknown_identifier() {
        let decoded = decoder().decode_payload(&[0x00, 0x00, 0x0A, 0xBC, 0xFF]);
        assert_eq!(decoded.message_name, "Unknown (0xABC)");
        assert!(decoded.signals.is_empty());
        assert!(decoded.is_ok());
        assert_eq!(decoded.raw_data, "ff");
    }

    #[test]
    fn identifier_only_payload() {
        let decoded = TelemetryDecoder::default().decode_payload(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(decoded.can_id, Some(0x1234_5678));
        assert_eq!(decoded.message_name, "Unknown (0x12345678)");
        assert_eq!(decoded.raw_data, "");
    }

    #[test]
    fn wrong_data_size_keeps_raw_hex() {
        let decoded = decoder().decode_payload(&[0x00, 0x00, 0x01, 0x00, 0xAA]);
        assert_eq!(decoded.message_name, "Battery");
        assert_eq!(
            decoded.decode_error.as_deref(),
            Some("Wrong data size: 1 instead of 4 bytes")
        );
        assert_eq!(decoded.raw_hex.as_deref(), Some("00 00 01 00 AA"));
        assert!(decoded.signals.is_empty());

        // A failed decode does not poison the next one.
        let next = decoder().decode_payload(&[0x00, 0x00, 0x01, 0x00, 0, 0, 0, 0]);
        assert!(next.is_ok());
    }

    #[test]
    fn float_rounding_and_display() {
        assert_eq!(
            format_value(&SignalValue::Float(3.14159), None),
            FormattedValue::Float(3.14)
        );
        assert_eq!(FormattedValue::Float(3.14).to_string(), "3.14");
        assert_eq!(FormattedValue::Float(12.0).to_string(), "12.0");
        assert_eq!(FormattedValue::Float(-0.5).to_string(), "-0.5");
        assert_eq!(FormattedValue::Integer(12).to_string(), "12");
    }

    #[test]
    fn large_and_tiny_floats_use_exponent() {
        assert_eq!(FormattedValue::Float(1e16).to_string(), "1e+16");
        assert_eq!(FormattedValue::Float(-1.5e20).to_string(), "-1.5e+20");
        assert_eq!(FormattedValue::Float(1e300).to_string(), "1e+300");
        assert_eq!(FormattedValue::Float(2.5e-5).to_string(), "2.5e-05");
        assert_eq!(
            FormattedValue::Float(9_999_999_999_999_998.0).to_string(),
            "9999999999999998.0"
        );
        assert_eq!(FormattedValue::Float(0.0001).to_string(), "0.0001");
        assert_eq!(FormattedValue::Float(0.0).to_string(), "0.0");
        assert_eq!(FormattedValue::Float(f64::NAN).to_string(), "nan");
        assert_eq!(FormattedValue::Float(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(
            format_value(&SignalValue::Float(2e16), Some("m")),
            FormattedValue::Text("2e+16 m".to_string())
        );
    }

    #[test]
    fn wide_integers_stay_positive() {
        let max = i128::from(u64::MAX);
        assert_eq!(
            format_value(&SignalValue::Integer(max), None).to_string(),
            "18446744073709551615"
        );
    }

    #[test]
    fn unit_appended_unless_present() {
        assert_eq!(
            format_value(&SignalValue::Integer(12), Some("V")),
            FormattedValue::Text("12 V".to_string())
        );
        assert_eq!(
            format_value(
                &SignalValue::Enumerated {
                    raw: 0,
                    name: "NONE".to_string()
                },
                Some("N")
            ),
            FormattedValue::Text("0 (NONE)".to_string())
        );
        assert_eq!(
            format_value(&SignalValue::Integer(7), Some("")),
            FormattedValue::Integer(7)
        );
    }

    #[test]
    fn enumerated_value_text() {
        assert_eq!(
            format_value(
                &SignalValue::Enumerated {
                    raw: 1,
                    name: "ACTIVE".to_string()
                },
                None
            ),
            FormattedValue::Text("1 (ACTIVE)".to_string())
        );
    }

    #[test]
    fn serializes_signals_as_ordered_object() {
        let decoded = decoder().decode_payload(&[0x00, 0x00, 0x01, 0x00, 0xE8, 0x03, 0x00, 0x32]);
        let json = serde_json::to_string(&decoded).unwrap();
        assert_eq!(
            json,
            r#"{"can_id":256,"message_name":"Battery","signals":{"Voltage":"10.0 V","Mode":"0 (IDLE)","Charge":"50 %"},"raw_data":"e8030032"}"#
        );

        let short = serde_json::to_value(decoder().decode_payload(&[0x01])).unwrap();
        assert_eq!(short["error"], "Payload too short");
        assert_eq!(short["raw_hex"], "01");
        assert!(short["can_id"].is_null());
    }
}
