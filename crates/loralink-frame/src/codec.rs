use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Default start-of-frame marker.
pub const START_MARKER: [u8; 4] = [0xAA, 0xBB, 0xCC, 0xDD];

/// Default end-of-frame marker.
pub const END_MARKER: [u8; 4] = [0xDD, 0xCC, 0xBB, 0xAA];

/// Default cap on bytes buffered while waiting for a complete frame: 64 KiB.
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

/// Configuration for marker framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    start_marker: Bytes,
    end_marker: Bytes,
    /// Longest accepted frame body, and the number of bytes the reader holds
    /// without a complete frame.
    pub max_buffer_size: usize,
}

impl FrameConfig {
    /// Use custom markers. Both must be non-empty.
    pub fn with_markers(start: impl Into<Bytes>, end: impl Into<Bytes>) -> Result<Self> {
        let start_marker = start.into();
        let end_marker = end.into();
        if start_marker.is_empty() || end_marker.is_empty() {
            return Err(FrameError::EmptyMarker);
        }
        Ok(Self {
            start_marker,
            end_marker,
            max_buffer_size: DEFAULT_MAX_BUFFER,
        })
    }

    /// The start-of-frame marker.
    pub fn start_marker(&self) -> &[u8] {
        &self.start_marker
    }

    /// The end-of-frame marker.
    pub fn end_marker(&self) -> &[u8] {
        &self.end_marker
    }

    /// Marker overhead added to every body.
    pub fn overhead(&self) -> usize {
        self.start_marker.len() + self.end_marker.len()
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            start_marker: Bytes::from_static(&START_MARKER),
            end_marker: Bytes::from_static(&END_MARKER),
            max_buffer_size: DEFAULT_MAX_BUFFER,
        }
    }
}

/// Encode a body into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────────────┬──────────────┐
/// │ Start marker │ Body            │ End marker   │
/// │ AA BB CC DD  │ (packet bytes)  │ DD CC BB AA  │
/// └──────────────┴─────────────────┴──────────────┘
/// ```
///
/// Fails if the body contains the end marker, since the reader would split
/// the frame there.
pub fn encode_frame(body: &[u8], config: &FrameConfig, dst: &mut BytesMut) -> Result<()> {
    if let Some(offset) = find(body, config.end_marker()) {
        return Err(FrameError::MarkerInBody { offset });
    }
    dst.reserve(config.overhead() + body.len());
    dst.put_slice(config.start_marker());
    dst.put_slice(body);
    dst.put_slice(config.end_marker());
    Ok(())
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
