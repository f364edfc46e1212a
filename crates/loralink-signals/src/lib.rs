//! Signal database and telemetry decoding.
//!
//! A [`SignalDatabase`] maps CAN identifiers to message layouts loaded from a
//! Vector DBC file or a JSON document. The [`TelemetryDecoder`] splits a
//! telemetry payload into identifier and data, decodes the data against the
//! database, and formats each signal for display.

pub mod config;
pub mod database;
mod dbc;
pub mod decoder;
pub mod error;
mod json;

pub use config::DatabaseConfig;
pub use database::{
    ByteOrder, MessageSchema, Multiplexing, SignalDatabase, SignalDefinition, SignalValue,
    ValueType,
};
pub use decoder::{format_value, DecodedTelemetry, FormattedValue, SignalReading, TelemetryDecoder};
pub use error::{LoadError, Result, SignalDecodeError};
