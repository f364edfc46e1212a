//! Vector DBC text parser.
//!
//! Only the keywords needed for decoding are interpreted: `BO_` (messages),
//! `SG_` (signals, including `M` / `mN` multiplexing), `VAL_` (value
//! tables) and `SIG_VALTYPE_` (IEEE float signals). Every other line is
//! ignored.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::debug;

use crate::database::{ByteOrder, MessageSchema, Multiplexing, SignalDefinition, ValueType};
use crate::error::{LoadError, Result};

/// Pseudo-message some tools emit to hold signals not bound to any frame.
const INDEPENDENT_SIGNALS: &str = "VECTOR__INDEPENDENT_SIG_MSG";

const EXTENDED_FLAG: u32 = 0x8000_0000;
const EXTENDED_MASK: u32 = 0x1FFF_FFFF;

struct ValueTable {
    line: usize,
    identifier: u32,
    signal: String,
    choices: BTreeMap<i64, String>,
}

struct ValueTypeOverride {
    line: usize,
    identifier: u32,
    signal: String,
    value_type: ValueType,
}

// Code points of bytes 0x80..=0x9F in Windows-1252. Unassigned bytes keep
// their Latin-1 control code point.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Decode DBC file bytes: UTF-8 when valid, otherwise Windows-1252.
pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(
            bytes
                .iter()
                .map(|&byte| match byte {
                    0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
                    _ => char::from(byte),
                })
                .collect(),
        ),
    }
}

pub(crate) fn parse(text: &str) -> Result<Vec<MessageSchema>> {
    let mut messages: Vec<MessageSchema> = Vec::new();
    let mut tables: Vec<ValueTable> = Vec::new();
    let mut value_types: Vec<ValueTypeOverride> = Vec::new();
    // None before the first message or inside the independent-signals block.
    let mut current: Option<usize> = None;
    let mut in_message = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };

        match keyword {
            "BO_" => {
                let message = parse_message(rest).map_err(|message| LoadError::Dbc {
                    line: line_no,
                    message,
                })?;
                in_message = true;
                if message.name == INDEPENDENT_SIGNALS {
                    current = None;
                } else {
                    messages.push(message);
                    current = Some(messages.len() - 1);
                }
            }
            "SG_" => {
                if !in_message {
                    return Err(LoadError::Dbc {
                        line: line_no,
                        message: "signal outside of a message".to_string(),
                    });
                }
                let signal = parse_signal(rest).map_err(|message| LoadError::Dbc {
                    line: line_no,
                    message,
                })?;
                if let Some(slot) = current {
                    messages[slot].signals.push(signal);
                }
            }
            "VAL_" => {
                let table = parse_value_table(rest, line_no).map_err(|message| LoadError::Dbc {
                    line: line_no,
                    message,
                })?;
                tables.push(table);
            }
            "SIG_VALTYPE_" => {
                let value_type =
                    parse_value_type(rest, line_no).map_err(|message| LoadError::Dbc {
                        line: line_no,
                        message,
                    })?;
                value_types.push(value_type);
            }
            _ => {}
        }
    }

    for value_type in value_types {
        match find_signal(&mut messages, value_type.identifier, &value_type.signal) {
            Some(signal) => signal.value_type = value_type.value_type,
            None => debug!(
                line = value_type.line,
                identifier = value_type.identifier,
                signal = %value_type.signal,
                "value type for unknown signal ignored"
            ),
        }
    }

    for table in tables {
        match find_signal(&mut messages, table.identifier, &table.signal) {
            Some(signal) => signal.choices = table.choices,
            None => debug!(
                line = table.line,
                identifier = table.identifier,
                signal = %table.signal,
                "value table for unknown signal ignored"
            ),
        }
    }

    Ok(messages)
}

fn find_signal<'a>(
    messages: &'a mut [MessageSchema],
    identifier: u32,
    name: &str,
) -> Option<&'a mut SignalDefinition> {
    messages
        .iter_mut()
        .find(|message| message.identifier == identifier)
        .and_then(|message| message.signals.iter_mut().find(|signal| signal.name == name))
}

fn normalize_identifier(raw: u32) -> u32 {
    if raw & EXTENDED_FLAG != 0 {
        raw & EXTENDED_MASK
    } else {
        raw
    }
}

fn parse_identifier(token: &str) -> std::result::Result<u32, String> {
    token
        .parse::<u32>()
        .map(normalize_identifier)
        .map_err(|_| format!("invalid message identifier {token:?}"))
}

// `256 EngineData: 8 ECU`
fn parse_message(rest: &str) -> std::result::Result<MessageSchema, String> {
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| "message definition missing ':'".to_string())?;

    let mut head = head.split_whitespace();
    let identifier = parse_identifier(head.next().unwrap_or_default())?;
    let name = head
        .next()
        .ok_or_else(|| "message definition missing name".to_string())?;

    let length_token = tail.split_whitespace().next().unwrap_or_default();
    let length = length_token
        .parse::<usize>()
        .map_err(|_| format!("invalid message length {length_token:?}"))?;

    Ok(MessageSchema {
        identifier,
        name: name.to_string(),
        length,
        signals: Vec::new(),
    })
}

// `EngineSpeed m1 : 0|16@1+ (0.125,0) [0|8031.875] "rpm" Vector__XXX`
fn parse_signal(rest: &str) -> std::result::Result<SignalDefinition, String> {
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| "signal definition missing ':'".to_string())?;

    let mut head = head.split_whitespace();
    let name = head
        .next()
        .ok_or_else(|| "signal definition missing name".to_string())?;
    let multiplexing = match head.next() {
        Some(indicator) => Some(parse_multiplex_indicator(indicator)?),
        None => None,
    };

    let tail = tail.trim();
    let layout = tail.split_whitespace().next().unwrap_or_default();
    let (start_bit, length, byte_order, signed) = parse_layout(layout)?;

    let open = tail
        .find('(')
        .ok_or_else(|| "signal definition missing scaling".to_string())?;
    let close = tail[open..]
        .find(')')
        .map(|pos| open + pos)
        .ok_or_else(|| "unterminated scaling".to_string())?;
    let (factor, offset) = tail[open + 1..close]
        .split_once(',')
        .ok_or_else(|| "scaling must be (factor,offset)".to_string())?;
    let factor = parse_float(factor)?;
    let offset = parse_float(offset)?;

    let after_scaling = &tail[close + 1..];
    let unit = after_scaling
        .split_once('"')
        .and_then(|(_, quoted)| quoted.split_once('"'))
        .map(|(unit, _)| unit.to_string())
        .filter(|unit| !unit.is_empty());

    Ok(SignalDefinition {
        name: name.to_string(),
        start_bit,
        length,
        byte_order,
        signed,
        value_type: ValueType::Integer,
        factor,
        offset,
        unit,
        choices: BTreeMap::new(),
        multiplexing,
    })
}

fn parse_multiplex_indicator(indicator: &str) -> std::result::Result<Multiplexing, String> {
    if indicator == "M" {
        return Ok(Multiplexing::Multiplexer);
    }
    // `mN`, or `mNM` for nested multiplexers; the outer switch value is what matters here.
    let digits: String = indicator
        .strip_prefix('m')
        .unwrap_or_default()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits
        .parse::<u64>()
        .map(Multiplexing::Multiplexed)
        .map_err(|_| format!("invalid multiplex indicator {indicator:?}"))
}

// `0|16@1+`
fn parse_layout(layout: &str) -> std::result::Result<(u32, u32, ByteOrder, bool), String> {
    let invalid = || format!("invalid signal layout {layout:?}");

    let (start, rest) = layout.split_once('|').ok_or_else(invalid)?;
    let (length, flags) = rest.split_once('@').ok_or_else(invalid)?;
    let start_bit = start.parse::<u32>().map_err(|_| invalid())?;
    let length = length.parse::<u32>().map_err(|_| invalid())?;

    let mut flags = flags.chars();
    let byte_order = match flags.next() {
        Some('1') => ByteOrder::LittleEndian,
        Some('0') => ByteOrder::BigEndian,
        _ => return Err(invalid()),
    };
    let signed = match flags.next() {
        Some('+') => false,
        Some('-') => true,
        _ => return Err(invalid()),
    };

    Ok((start_bit, length, byte_order, signed))
}

fn parse_float(token: &str) -> std::result::Result<f64, String> {
    let token = token.trim();
    token
        .parse::<f64>()
        .map_err(|_| format!("invalid number {token:?}"))
}

// `256 Status 0 "OFF" 1 "ACTIVE" ;`
fn parse_value_table(rest: &str, line: usize) -> std::result::Result<ValueTable, String> {
    let (identifier, rest) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| "value table missing signal".to_string())?;
    let identifier = parse_identifier(identifier)?;
    let rest = rest.trim_start();
    let (signal, mut rest) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| "value table missing entries".to_string())?;

    let mut choices = BTreeMap::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with(';') {
            break;
        }
        let (raw, after) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| "value table entry missing description".to_string())?;
        let raw = raw
            .parse::<i64>()
            .map_err(|_| format!("invalid table value {raw:?}"))?;
        let quoted = after
            .trim_start()
            .strip_prefix('"')
            .ok_or_else(|| "value description must be quoted".to_string())?;
        let (description, after) = quoted
            .split_once('"')
            .ok_or_else(|| "unterminated value description".to_string())?;
        choices.insert(raw, description.to_string());
        rest = after;
    }

    Ok(ValueTable {
        line,
        identifier,
        signal: signal.to_string(),
        choices,
    })
}

// `256 Temperature : 1;`
fn parse_value_type(rest: &str, line: usize) -> std::result::Result<ValueTypeOverride, String> {
    let (head, code) = rest
        .split_once(':')
        .ok_or_else(|| "value type missing ':'".to_string())?;

    let mut head = head.split_whitespace();
    let identifier = parse_identifier(head.next().unwrap_or_default())?;
    let signal = head
        .next()
        .ok_or_else(|| "value type missing signal".to_string())?;

    let code = code.trim().trim_end_matches(';').trim();
    let value_type = match code {
        "0" => ValueType::Integer,
        "1" => ValueType::Float32,
        "2" => ValueType::Float64,
        other => return Err(format!("unknown signal value type {other:?}")),
    };

    Ok(ValueTypeOverride {
        line,
        identifier,
        signal: signal.to_string(),
        value_type,
    })
}
