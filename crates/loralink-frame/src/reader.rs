use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::{find, FrameConfig};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Incrementally extracts marker-delimited frame bodies from a byte stream.
///
/// Feed it whatever the stream produced, in any chunking, then call
/// [`next_frame`](FrameReader::next_frame) until it returns `None`.
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    config: FrameConfig,
    resyncs: u64,
    // Inside a frame already known to exceed the limit; wait for its end marker.
    skipping: bool,
}

impl FrameReader {
    /// Create a new frame reader with default markers.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            resyncs: 0,
            skipping: false,
        }
    }

    /// Append raw bytes to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        if self.buf.len() > self.config.max_buffer_size {
            self.shed_excess();
        }
    }

    /// Extract the next complete frame body, if one is buffered.
    ///
    /// The body is the span strictly between the first start marker and the
    /// first end marker. When the first end marker begins before the first
    /// start marker ends, everything through that end marker is discarded and
    /// the scan restarts. Bodies longer than `max_buffer_size` are dropped.
    /// Every iteration either returns a frame or shrinks the buffer.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let start_len = self.config.start_marker().len();
        let end_len = self.config.end_marker().len();

        loop {
            if self.skipping {
                let end = find(&self.buf, self.config.end_marker())?;
                self.buf.advance(end + end_len);
                self.skipping = false;
                continue;
            }

            let start = find(&self.buf, self.config.start_marker())?;
            let end = find(&self.buf, self.config.end_marker())?;
            let body_start = start + start_len;

            if body_start > end {
                let discarded = end + end_len;
                warn!(discarded, "end marker before start marker, resynchronizing");
                self.buf.advance(discarded);
                self.resyncs += 1;
                continue;
            }

            let body_len = end - body_start;
            if body_len > self.config.max_buffer_size {
                warn!(
                    body_len,
                    limit = self.config.max_buffer_size,
                    "dropping oversized frame"
                );
                self.buf.advance(end + end_len);
                self.resyncs += 1;
                continue;
            }

            if start > 0 {
                debug!(skipped = start, "skipping bytes before start marker");
            }
            self.buf.advance(body_start);
            let body = self.buf.split_to(body_len).freeze();
            self.buf.advance(end_len);
            return Some(body);
        }
    }

    /// Number of bytes waiting for a complete frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Number of times corrupted input forced a resynchronization.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.skipping = false;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    // Only runs while no end marker is buffered, so every drop here matches
    // what next_frame would eventually discard for the same bytes.
    fn shed_excess(&mut self) {
        if find(&self.buf, self.config.end_marker()).is_some() {
            return;
        }

        let len = self.buf.len();
        let start_len = self.config.start_marker().len();
        let end_tail = self.config.end_marker().len() - 1;
        let keep_tail = end_tail.max(start_len - 1);

        let drop = if self.skipping {
            len.saturating_sub(end_tail)
        } else {
            match find(&self.buf, self.config.start_marker()) {
                Some(start) => {
                    let pending = len - (start + start_len);
                    if pending.saturating_sub(end_tail) > self.config.max_buffer_size {
                        warn!(
                            pending,
                            limit = self.config.max_buffer_size,
                            "frame over limit, skipping to its end marker"
                        );
                        self.skipping = true;
                        self.resyncs += 1;
                        len.saturating_sub(end_tail)
                    } else {
                        start.min(len.saturating_sub(end_tail))
                    }
                }
                None => len.saturating_sub(keep_tail),
            }
        };

        if drop > 0 {
            debug!(
                dropped = drop,
                limit = self.config.max_buffer_size,
                "frame buffer over limit, dropping unframed bytes"
            );
            self.buf.advance(drop);
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}
