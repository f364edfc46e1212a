//! Packets exchanged with a LoRa link device.
//!
//! A [`Packet`] is one of five variants (TRANSMISSION, SETTINGS, REQUEST,
//! GPS, LOG). On the wire each packet body is a protobuf message carrying a
//! type tag plus the matching sub-message; [`encode`] and [`decode`] convert
//! between the two. Framing is handled by `loralink-frame`.

pub mod codec;
pub mod error;
pub mod packet;
mod wire;

pub use codec::{decode, encode};
pub use error::{DecodeError, Result};
pub use packet::{
    DeviceSettings, DeviceState, GpsFix, LogRecord, Packet, PacketType, Request, Transmission,
};
