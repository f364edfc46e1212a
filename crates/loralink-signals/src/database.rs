use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::error::{LoadError, Result, SignalDecodeError};

/// Bit numbering of a signal inside the data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Intel: `start_bit` is the least significant bit, counted LSB-first.
    #[default]
    LittleEndian,
    /// Motorola: `start_bit` is the most significant bit, sawtooth numbering.
    BigEndian,
}

/// Role of a signal in a multiplexed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplexing {
    /// The switch signal selecting which multiplexed signals are present.
    Multiplexer,
    /// Present only when the switch carries this value.
    Multiplexed(u64),
}

/// How a signal's raw bits are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Unsigned or two's-complement integer, per `signed`.
    #[default]
    Integer,
    /// IEEE 754 single precision; the signal is 32 bits wide.
    Float32,
    /// IEEE 754 double precision; the signal is 64 bits wide.
    Float64,
}

/// Layout and scaling of one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    pub name: String,
    pub start_bit: u32,
    pub length: u32,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default = "unit_factor")]
    pub factor: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Value names keyed by raw value. Empty when the signal is not enumerated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub choices: BTreeMap<i64, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplexing: Option<Multiplexing>,
}

fn unit_factor() -> f64 {
    1.0
}

/// One decoded signal value before display formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    /// Scaled value whose factor and offset are both integral.
    Integer(i128),
    /// Scaled value with a fractional factor or offset.
    Float(f64),
    /// Raw value that has a name in the signal's value table.
    Enumerated { raw: i64, name: String },
}

impl SignalDefinition {
    /// Build an unsigned little-endian signal with identity scaling.
    pub fn new(name: impl Into<String>, start_bit: u32, length: u32) -> Self {
        Self {
            name: name.into(),
            start_bit,
            length,
            byte_order: ByteOrder::LittleEndian,
            signed: false,
            value_type: ValueType::Integer,
            factor: 1.0,
            offset: 0.0,
            unit: None,
            choices: BTreeMap::new(),
            multiplexing: None,
        }
    }

    /// Extract the unscaled bits of this signal from `data`.
    pub fn raw_bits(&self, data: &[u8]) -> std::result::Result<u64, SignalDecodeError> {
        let out_of_bounds = || SignalDecodeError::OutOfBounds {
            signal: self.name.clone(),
            available: data.len(),
        };
        let bit_at = |pos: usize| -> Option<u64> {
            data.get(pos / 8).map(|byte| u64::from((*byte >> (pos % 8)) & 1))
        };

        let mut value: u64 = 0;
        match self.byte_order {
            ByteOrder::LittleEndian => {
                let start = self.start_bit as usize;
                for k in 0..self.length as usize {
                    let bit = bit_at(start + k).ok_or_else(out_of_bounds)?;
                    value |= bit << k;
                }
            }
            ByteOrder::BigEndian => {
                let mut pos = self.start_bit as usize;
                for _ in 0..self.length {
                    let bit = bit_at(pos).ok_or_else(out_of_bounds)?;
                    value = (value << 1) | bit;
                    // Walk MSB to LSB within a byte, then jump to the MSB of the next byte.
                    if pos % 8 == 0 {
                        pos += 15;
                    } else {
                        pos -= 1;
                    }
                }
            }
        }
        Ok(value)
    }

    /// Extract the raw value, sign-extended when the signal is signed.
    ///
    /// Unsigned 64-bit signals keep their full range.
    pub fn raw_value(&self, data: &[u8]) -> std::result::Result<i128, SignalDecodeError> {
        let bits = self.raw_bits(data)?;
        if !self.signed {
            return Ok(i128::from(bits));
        }
        if self.length >= 64 {
            return Ok(i128::from(bits as i64));
        }
        let sign = 1u64 << (self.length - 1);
        if bits & sign == 0 {
            Ok(i128::from(bits))
        } else {
            Ok(i128::from((bits | !((1u64 << self.length) - 1)) as i64))
        }
    }

    /// Decode this signal from `data`: value-table lookup first, then scaling.
    pub fn decode(&self, data: &[u8]) -> std::result::Result<SignalValue, SignalDecodeError> {
        match self.value_type {
            ValueType::Float32 => {
                let bits = self.raw_bits(data)? as u32;
                let value = f64::from(f32::from_bits(bits));
                Ok(SignalValue::Float(value * self.factor + self.offset))
            }
            ValueType::Float64 => {
                let value = f64::from_bits(self.raw_bits(data)?);
                Ok(SignalValue::Float(value * self.factor + self.offset))
            }
            ValueType::Integer => {
                let raw = self.raw_value(data)?;
                let named = i64::try_from(raw)
                    .ok()
                    .and_then(|raw| self.choices.get(&raw).map(|name| (raw, name)));
                if let Some((raw, name)) = named {
                    return Ok(SignalValue::Enumerated {
                        raw,
                        name: name.clone(),
                    });
                }
                Ok(self.scale(raw))
            }
        }
    }

    fn scale(&self, raw: i128) -> SignalValue {
        if is_integral(self.factor) && is_integral(self.offset) {
            SignalValue::Integer(
                raw.saturating_mul(self.factor as i128)
                    .saturating_add(self.offset as i128),
            )
        } else {
            SignalValue::Float(raw as f64 * self.factor + self.offset)
        }
    }

    fn validate(&self, message: &str) -> Result<()> {
        let invalid = |reason: String| LoadError::InvalidSignal {
            message: message.to_string(),
            signal: self.name.clone(),
            reason,
        };
        if !(1..=64).contains(&self.length) {
            return Err(invalid(format!("bit length {} not in 1..=64", self.length)));
        }
        if !self.factor.is_finite() || !self.offset.is_finite() {
            return Err(invalid("factor and offset must be finite".to_string()));
        }
        let float_width = match self.value_type {
            ValueType::Integer => None,
            ValueType::Float32 => Some(32),
            ValueType::Float64 => Some(64),
        };
        if let Some(width) = float_width {
            if self.length != width {
                return Err(invalid(format!(
                    "{width}-bit float signal has bit length {}",
                    self.length
                )));
            }
        }
        Ok(())
    }
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

/// Layout of one CAN message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSchema {
    pub identifier: u32,
    pub name: String,
    /// Expected data length in bytes.
    pub length: usize,
    #[serde(default)]
    pub signals: Vec<SignalDefinition>,
}

impl MessageSchema {
    /// Find a signal by name.
    pub fn signal(&self, name: &str) -> Option<&SignalDefinition> {
        self.signals.iter().find(|signal| signal.name == name)
    }

    /// The multiplexer switch signal, if this message is multiplexed.
    pub fn multiplexer(&self) -> Option<&SignalDefinition> {
        self.signals
            .iter()
            .find(|signal| signal.multiplexing == Some(Multiplexing::Multiplexer))
    }

    /// Decode every signal present in `data`, in definition order.
    ///
    /// Multiplexed signals are skipped unless the switch value selects them.
    pub fn decode(
        &self,
        data: &[u8],
    ) -> std::result::Result<Vec<(String, SignalValue)>, SignalDecodeError> {
        if data.len() < self.length {
            return Err(SignalDecodeError::WrongDataSize {
                actual: data.len(),
                expected: self.length,
            });
        }

        let switch = match self.multiplexer() {
            Some(signal) => Some(signal.raw_bits(data)?),
            None => None,
        };

        let mut values = Vec::with_capacity(self.signals.len());
        for signal in &self.signals {
            if let Some(Multiplexing::Multiplexed(id)) = signal.multiplexing {
                if switch != Some(id) {
                    continue;
                }
            }
            values.push((signal.name.clone(), signal.decode(data)?));
        }
        Ok(values)
    }

    fn validate(&self) -> Result<()> {
        let mut multiplexers = 0usize;
        for signal in &self.signals {
            signal.validate(&self.name)?;
            if signal.multiplexing == Some(Multiplexing::Multiplexer) {
                multiplexers += 1;
            }
        }
        if multiplexers > 1 {
            return Err(LoadError::InvalidSignal {
                message: self.name.clone(),
                signal: "*".to_string(),
                reason: format!("{multiplexers} multiplexer signals"),
            });
        }
        if multiplexers == 0 {
            if let Some(orphan) = self
                .signals
                .iter()
                .find(|signal| matches!(signal.multiplexing, Some(Multiplexing::Multiplexed(_))))
            {
                return Err(LoadError::InvalidSignal {
                    message: self.name.clone(),
                    signal: orphan.name.clone(),
                    reason: "multiplexed signal without a multiplexer".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Identifier-keyed collection of message layouts. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct SignalDatabase {
    messages: HashMap<u32, MessageSchema>,
}

impl SignalDatabase {
    /// An empty database; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a database from message layouts. Identifiers must be unique.
    pub fn from_messages(messages: impl IntoIterator<Item = MessageSchema>) -> Result<Self> {
        let mut map = HashMap::new();
        for message in messages {
            message.validate()?;
            let identifier = message.identifier;
            if map.insert(identifier, message).is_some() {
                return Err(LoadError::DuplicateIdentifier(identifier));
            }
        }
        Ok(Self { messages: map })
    }

    /// Parse Vector DBC text.
    pub fn parse_dbc(text: &str) -> Result<Self> {
        Self::from_messages(crate::dbc::parse(text)?)
    }

    /// Parse and validate a JSON database document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_messages(crate::json::parse(text)?)
    }

    /// Load a database file, choosing the format by extension (`.dbc` or `.json`).
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_config(path, DatabaseConfig::default())
    }

    /// Load a database file with explicit config.
    pub fn load_with_config(path: &Path, config: DatabaseConfig) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if extension != "dbc" && extension != "json" {
            return Err(LoadError::UnsupportedFormat(path.display().to_string()));
        }

        let bytes = read_bounded(path, config.max_file_size)?;
        let database = if extension == "dbc" {
            Self::parse_dbc(&crate::dbc::decode_text(&bytes))?
        } else {
            Self::from_messages(crate::json::parse_slice(&bytes)?)?
        };

        info!(
            path = %path.display(),
            messages = database.len(),
            "loaded signal database"
        );
        Ok(database)
    }

    /// Load a database file, falling back to an empty database on any failure.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(database) => database,
            Err(err) => {
                error!(path = %path.display(), error = %err, "signal database unavailable, decoding disabled");
                Self::empty()
            }
        }
    }

    /// Look up a message layout by identifier.
    pub fn lookup(&self, identifier: u32) -> Option<&MessageSchema> {
        self.messages.get(&identifier)
    }

    /// Decode `data` against the message with `identifier`.
    pub fn decode(
        &self,
        identifier: u32,
        data: &[u8],
    ) -> std::result::Result<Vec<(String, SignalValue)>, SignalDecodeError> {
        self.lookup(identifier)
            .ok_or(SignalDecodeError::UnknownMessage(identifier))?
            .decode(data)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Known identifiers, ascending.
    pub fn identifiers(&self) -> Vec<u32> {
        let mut identifiers: Vec<u32> = self.messages.keys().copied().collect();
        identifiers.sort_unstable();
        identifiers
    }
}

fn read_bounded(path: &Path, max_bytes: usize) -> Result<Vec<u8>> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();
    if size > max_bytes as u64 {
        return Err(LoadError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: max_bytes,
        });
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut bytes = Vec::new();
    file.take(read_limit)
        .read_to_end(&mut bytes)
        .map_err(io_err)?;
    if bytes.len() > max_bytes {
        return Err(LoadError::TooLarge {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            max: max_bytes,
        });
    }
    Ok(bytes)
}
