use crate::packet::PacketType;

/// Errors that can occur while decoding a packet body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame carried no bytes at all.
    #[error("empty packet body")]
    Empty,

    /// The body is not a valid protobuf message (truncated or corrupted).
    #[error("malformed packet body: {0}")]
    Malformed(#[from] prost::DecodeError),

    /// The type tag is not one this build understands.
    #[error("unknown packet type {0}")]
    UnknownType(i32),

    /// A REQUEST asked for a device state this build does not know.
    #[error("unknown device state {0}")]
    UnknownState(i32),

    /// The type tag names a variant whose body is absent.
    #[error("{0} packet without a body")]
    MissingBody(PacketType),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
