//! Start/end marker framing over LoRa link byte streams.
//!
//! Every packet body travels on the wire as:
//! - a fixed start marker (default `AA BB CC DD`)
//! - the serialized packet body
//! - a fixed end marker (default `DD CC BB AA`)
//!
//! Markers are not escaped. [`FrameReader`] accumulates arbitrary chunks and
//! resynchronizes on corrupted input; [`FrameWriter`] emits complete frames.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{encode_frame, FrameConfig, DEFAULT_MAX_BUFFER, END_MARKER, START_MARKER};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
