//! Configure LoRa link devices over a serial byte stream and decode the
//! telemetry they relay.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream abstraction (serial port, in-memory pair)
//! - [`frame`]: Start/end marker framing with resynchronization
//! - [`packet`]: Discriminated packet model and its protobuf wire body
//! - [`signals`]: Signal database (DBC / JSON) and telemetry decoding
//! - [`session`]: Device session: status requests, receive loop, telemetry queue

/// Re-export transport types.
pub mod transport {
    pub use loralink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use loralink_frame::*;
}

/// Re-export packet types.
pub mod packet {
    pub use loralink_packet::*;
}

/// Re-export signal database and decoder types.
pub mod signals {
    pub use loralink_signals::*;
}

/// Re-export session types.
pub mod session {
    pub use loralink_session::*;
}

pub use loralink_packet::{DeviceSettings, DeviceState, GpsFix, Packet, PacketType};
pub use loralink_session::{DeviceSession, SessionConfig, StatusReport, TelemetryQueue};
pub use loralink_signals::{SignalDatabase, TelemetryDecoder};
