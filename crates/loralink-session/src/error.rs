/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No stream is attached to the session.
    #[error("device stream unavailable")]
    StreamUnavailable,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] loralink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] loralink_frame::FrameError),

    /// The receiver worker panicked.
    #[error("receiver worker panicked")]
    Join,
}

pub type Result<T> = std::result::Result<T, SessionError>;
