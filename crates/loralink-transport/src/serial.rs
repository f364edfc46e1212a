use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::DeviceStream;

/// Default baud rate of the LoRa link firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Timeout applied to blocking reads and writes on the port.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(1),
        }
    }
}

/// A [`DeviceStream`] backed by an OS serial port.
pub struct SerialStream {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialStream {
    /// Open a serial port with default parameters (115200 baud, 1 s timeout).
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_config(path, &SerialConfig::default())
    }

    /// Open a serial port with explicit parameters.
    pub fn open_with_config(path: &str, config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(path, config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;

        info!(port = path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            port,
            name: path.to_string(),
        })
    }

    /// Port name this stream was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DeviceStream for SerialStream {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }

    fn bytes_available(&self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn discard_input(&mut self) -> Result<usize> {
        let pending = self.bytes_available()?;
        self.port.clear(ClearBuffer::Input)?;
        debug!(port = %self.name, pending, "cleared serial input buffer");
        Ok(pending)
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_firmware() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn opening_missing_port_reports_port_name() {
        let err = SerialStream::open("/dev/loralink-does-not-exist").unwrap_err();
        match err {
            TransportError::Open { port, .. } => {
                assert_eq!(port, "/dev/loralink-does-not-exist");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
