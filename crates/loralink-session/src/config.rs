use std::time::Duration;

use loralink_frame::FrameConfig;

/// Timing and framing parameters of a device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause after every paced send, giving the device time to act. Zero disables it.
    pub send_delay: Duration,
    /// Sleep between polls when no input is waiting.
    pub poll_interval: Duration,
    /// Default deadline for [`request_status`](crate::DeviceSession::request_status).
    pub status_timeout: Duration,
    /// Frame markers and reader buffer limit.
    pub frame: FrameConfig,
}

impl SessionConfig {
    /// Configuration without pacing, for loopback and tests.
    pub fn immediate() -> Self {
        Self {
            send_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(5),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_delay: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            status_timeout: Duration::from_secs(5),
            frame: FrameConfig::default(),
        }
    }
}
