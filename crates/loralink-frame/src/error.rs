use loralink_transport::TransportError;

/// Errors that can occur during frame encoding or writing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A frame marker was configured as an empty byte sequence.
    #[error("frame markers must not be empty")]
    EmptyMarker,

    /// The body contains the end marker and would be cut short on the wire.
    #[error("frame body contains the end marker at offset {offset}")]
    MarkerInBody { offset: usize },

    /// The underlying stream failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
