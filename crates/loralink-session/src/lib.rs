//! Device session management for LoRa link devices.
//!
//! A [`DeviceSession`] owns the byte stream to one device. It sends framed
//! packets, correlates status requests with their replies, and runs the
//! telemetry receive loop that feeds a [`TelemetryQueue`].
//!
//! The stream is exclusively owned: the receive loop takes the session by
//! value on its worker thread and hands it back on [`ReceiverHandle::stop`],
//! so a status request can never interleave with streaming.

#[cfg(feature = "async")]
pub mod async_receiver;
pub mod config;
pub mod error;
pub mod receiver;
pub mod session;
pub mod status;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use receiver::{ReceiverHandle, StopSignal, TelemetryQueue, TelemetryRecord};
pub use session::{DeviceSession, SessionStats};
pub use status::StatusReport;
