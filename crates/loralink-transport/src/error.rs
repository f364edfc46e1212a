/// Errors that can occur on a device byte stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial port.
    #[cfg(feature = "serial")]
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The serial driver reported an error outside of plain I/O.
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream has been closed.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
