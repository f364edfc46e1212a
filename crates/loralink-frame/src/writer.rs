use bytes::BytesMut;
use loralink_transport::DeviceStream;
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes complete frames to a [`DeviceStream`].
///
/// The writer does not own the stream, so a session can share one stream
/// between its reader and writer halves.
#[derive(Debug)]
pub struct FrameWriter {
    buf: BytesMut,
    config: FrameConfig,
}

impl FrameWriter {
    /// Create a new frame writer with default markers.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame `body` and write it to `stream`, then flush.
    ///
    /// Returns the number of bytes put on the wire.
    pub fn write<S: DeviceStream + ?Sized>(&mut self, stream: &mut S, body: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_frame(body, &self.config, &mut self.buf)?;

        stream.write_all(&self.buf)?;
        stream.flush()?;

        trace!(body_len = body.len(), wire_len = self.buf.len(), "wrote frame");
        Ok(self.buf.len())
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use loralink_transport::{MemoryStream, TransportError};

    use super::*;
    use crate::codec::{END_MARKER, START_MARKER};
    use crate::error::FrameError;
    use crate::reader::FrameReader;

    #[test]
    fn write_single_frame() {
        let (mut host, device) = MemoryStream::pair();
        let mut writer = FrameWriter::new();

        let written = writer.write(&mut host, b"hello").unwrap();
        assert_eq!(written, 5 + START_MARKER.len() + END_MARKER.len());

        let mut reader = FrameReader::new();
        reader.feed(&device.take_available());
        assert_eq!(reader.next_frame().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn write_multiple_frames() {
        let (mut host, device) = MemoryStream::pair();
        let mut writer = FrameWriter::new();

        writer.write(&mut host, b"one").unwrap();
        writer.write(&mut host, b"two").unwrap();

        let mut reader = FrameReader::new();
        reader.feed(&device.take_available());
        assert_eq!(reader.next_frame().unwrap().as_ref(), b"one");
        assert_eq!(reader.next_frame().unwrap().as_ref(), b"two");
        assert!(reader.next_frame().is_none());
    }

    #[test]
    fn write_to_closed_stream_fails() {
        let (mut host, device) = MemoryStream::pair();
        device.close();

        let mut writer = FrameWriter::new();
        let err = writer.write(&mut host, b"x").unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Closed)));
    }

    #[test]
    fn marker_in_body_writes_nothing() {
        let (mut host, device) = MemoryStream::pair();
        let mut writer = FrameWriter::new();

        assert!(writer.write(&mut host, &END_MARKER).is_err());
        assert!(device.take_available().is_empty());
    }
}
