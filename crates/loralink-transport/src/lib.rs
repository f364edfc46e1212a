//! Byte-stream abstraction for LoRa link devices.
//!
//! Everything above this crate talks to the radio through the
//! [`DeviceStream`] trait:
//! - [`SerialStream`] wraps a real serial port (feature `serial`)
//! - [`MemoryStream`] is an in-process duplex pair used for tests and loopback
//!
//! This is the lowest layer of loralink.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::MemoryStream;
pub use traits::DeviceStream;

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialStream, DEFAULT_BAUD_RATE};
