use std::path::PathBuf;

/// Errors that can occur while loading a signal database.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The database file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database file exceeds the configured size limit.
    #[error("database file too large ({size} bytes, max {max}): {path}")]
    TooLarge { path: PathBuf, size: u64, max: usize },

    /// The file extension does not name a known database format.
    #[error("unsupported database format: {0}")]
    UnsupportedFormat(String),

    /// A DBC line could not be parsed.
    #[error("DBC syntax error on line {line}: {message}")]
    Dbc { line: usize, message: String },

    /// The JSON document is not valid JSON or does not match the expected shape.
    #[error("invalid JSON database: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The JSON document failed schema validation.
    #[error("database document failed validation: {0}")]
    ValidationFailed(String),

    /// Two messages share an identifier.
    #[error("duplicate message identifier 0x{0:X}")]
    DuplicateIdentifier(u32),

    /// A signal definition is unusable.
    #[error("invalid signal {message}.{signal}: {reason}")]
    InvalidSignal {
        message: String,
        signal: String,
        reason: String,
    },
}

/// Errors that can occur while decoding a message's data bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalDecodeError {
    /// No message with this identifier is in the database.
    #[error("unknown message identifier 0x{0:X}")]
    UnknownMessage(u32),

    /// The data is shorter than the message length.
    #[error("Wrong data size: {actual} instead of {expected} bytes")]
    WrongDataSize { actual: usize, expected: usize },

    /// A signal's bits reach past the end of the data.
    #[error("signal {signal} reaches past {available} data bytes")]
    OutOfBounds { signal: String, available: usize },
}

pub type Result<T> = std::result::Result<T, LoadError>;
