use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use loralink_frame::{FrameReader, FrameWriter};
use loralink_packet::{
    DeviceSettings, DeviceState, GpsFix, Packet, PacketType, Request, Transmission,
};
use loralink_transport::DeviceStream;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::status::StatusReport;

const READ_CHUNK: usize = 1024;

type Handler = Box<dyn FnMut(&Packet) + Send>;

/// Packet counters of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
    /// Packets written to the device.
    pub transmitted: u64,
    /// Packets received and decoded.
    pub received: u64,
    /// Frame bodies that failed to decode.
    pub decode_failures: u64,
    /// Times the frame reader discarded corrupted input.
    pub resyncs: u64,
}

/// Exclusive connection to one LoRa link device.
pub struct DeviceSession<S: DeviceStream> {
    stream: Option<S>,
    reader: FrameReader,
    writer: FrameWriter,
    config: SessionConfig,
    settings: Option<DeviceSettings>,
    gps: Option<GpsFix>,
    stats: SessionStats,
    handlers: HashMap<PacketType, Handler>,
}

impl<S: DeviceStream> DeviceSession<S> {
    /// Create a session over `stream` with default config.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, SessionConfig::default())
    }

    /// Create a session over `stream` with explicit config.
    pub fn with_config(stream: S, config: SessionConfig) -> Self {
        let mut session = Self::detached_with_config(config);
        session.stream = Some(stream);
        session
    }

    /// Create a session with no stream attached.
    pub fn detached() -> Self {
        Self::detached_with_config(SessionConfig::default())
    }

    /// Create a session with no stream attached and explicit config.
    pub fn detached_with_config(config: SessionConfig) -> Self {
        Self {
            stream: None,
            reader: FrameReader::with_config(config.frame.clone()),
            writer: FrameWriter::with_config(config.frame.clone()),
            config,
            settings: None,
            gps: None,
            stats: SessionStats::default(),
            handlers: HashMap::new(),
        }
    }

    /// Attach a stream, returning the previously attached one.
    ///
    /// Buffered input from the old stream is dropped.
    pub fn attach(&mut self, stream: S) -> Option<S> {
        self.reader.clear();
        info!("device stream attached");
        self.stream.replace(stream)
    }

    /// Detach and return the stream.
    pub fn disconnect(&mut self) -> Option<S> {
        self.reader.clear();
        let stream = self.stream.take();
        if stream.is_some() {
            info!("device stream detached");
        }
        stream
    }

    pub fn is_attached(&self) -> bool {
        self.stream.is_some()
    }

    /// Send a packet, then pause for the configured send delay.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        self.write_packet(packet)?;
        if !self.config.send_delay.is_zero() {
            thread::sleep(self.config.send_delay);
        }
        Ok(())
    }

    /// Send a TRANSMISSION packet carrying `payload`.
    pub fn send_transmission(&mut self, payload: &[u8]) -> Result<()> {
        self.send(&Packet::Transmission(Transmission {
            payload: payload.to_vec(),
        }))
    }

    /// Send a full settings block to the device.
    ///
    /// The locally known settings are not changed; query the status to
    /// read back what the device applied.
    pub fn apply_settings(&mut self, settings: DeviceSettings) -> Result<()> {
        info!(
            frequency = settings.frequency,
            power = settings.power,
            bandwidth = settings.bandwidth,
            spreading_factor = settings.spreading_factor,
            "applying device settings"
        );
        self.write_packet(&Packet::Settings(settings))
    }

    /// Command the device into `state`.
    pub fn change_state(&mut self, state: DeviceState) -> Result<()> {
        self.write_packet(&Packet::Request(Request::state_change(state)))?;
        info!(%state, "requested device state change");
        Ok(())
    }

    /// Query settings and GPS fix, waiting at most `timeout`.
    ///
    /// Pending input is discarded first so stale replies are not mistaken
    /// for answers. The first SETTINGS and first GPS packet are taken; a
    /// timeout yields a partial report, not an error.
    pub fn request_status(&mut self, timeout: Duration) -> Result<StatusReport> {
        let discarded = self.stream_mut()?.discard_input()?;
        self.reader.clear();
        if discarded > 0 {
            debug!(discarded, "discarded stale input before status request");
        }

        self.write_packet(&Packet::Request(Request::settings()))?;
        self.write_packet(&Packet::Request(Request::gps()))?;

        let deadline = Instant::now() + timeout;
        let mut report = StatusReport::default();
        loop {
            let complete = self.process_one_frame(|packet| {
                match packet {
                    Packet::Settings(settings) if report.settings.is_none() => {
                        report.settings = Some(settings.clone());
                    }
                    Packet::Gps(gps) if report.gps.is_none() => {
                        report.gps = Some(gps.clone());
                    }
                    _ => {}
                }
                if report.is_complete() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })?;
            if complete {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    settings = report.settings.is_some(),
                    gps = report.gps.is_some(),
                    ?timeout,
                    "status request timed out"
                );
                break;
            }
            thread::sleep(self.config.poll_interval.min(deadline - now));
        }

        Ok(report)
    }

    /// [`request_status`](Self::request_status) with the configured timeout.
    pub fn request_status_default(&mut self) -> Result<StatusReport> {
        self.request_status(self.config.status_timeout)
    }

    /// Read whatever input is waiting and dispatch every complete packet.
    ///
    /// Registered handlers run first, then `callback`. Returns `true` as soon
    /// as the callback breaks; remaining frames stay buffered for the next
    /// call. Bodies that fail to decode are logged and skipped.
    pub fn process_one_frame<F>(&mut self, mut callback: F) -> Result<bool>
    where
        F: FnMut(&Packet) -> ControlFlow<()>,
    {
        let stream = self.stream.as_mut().ok_or(SessionError::StreamUnavailable)?;
        let mut chunk = [0u8; READ_CHUNK];
        let mut remaining = stream.bytes_available()?;
        while remaining > 0 {
            let want = remaining.min(READ_CHUNK);
            let read = stream.read(&mut chunk[..want])?;
            if read == 0 {
                break;
            }
            self.reader.feed(&chunk[..read]);
            remaining = remaining.saturating_sub(read);
        }

        while let Some(body) = self.reader.next_frame() {
            let packet = match loralink_packet::decode(&body) {
                Ok(packet) => packet,
                Err(err) => {
                    self.stats.decode_failures += 1;
                    warn!(error = %err, body_len = body.len(), "failed to decode packet");
                    continue;
                }
            };

            self.stats.received += 1;
            let packet_type = packet.packet_type();
            debug!(%packet_type, "received packet");

            match &packet {
                Packet::Settings(settings) => self.settings = Some(settings.clone()),
                Packet::Gps(gps) => self.gps = Some(gps.clone()),
                _ => {}
            }

            if let Some(handler) = self.handlers.get_mut(&packet_type) {
                handler(&packet);
            }
            if callback(&packet).is_break() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Register a handler run for every received packet of `packet_type`.
    ///
    /// Replaces any handler previously registered for that type.
    pub fn register_handler<F>(&mut self, packet_type: PacketType, handler: F)
    where
        F: FnMut(&Packet) + Send + 'static,
    {
        self.handlers.insert(packet_type, Box::new(handler));
    }

    /// Remove the handler for `packet_type`. Returns whether one was registered.
    pub fn remove_handler(&mut self, packet_type: PacketType) -> bool {
        self.handlers.remove(&packet_type).is_some()
    }

    /// Number of bytes waiting on the stream.
    pub fn bytes_available(&self) -> Result<usize> {
        let stream = self.stream.as_ref().ok_or(SessionError::StreamUnavailable)?;
        Ok(stream.bytes_available()?)
    }

    /// Settings from the most recent SETTINGS packet.
    pub fn settings(&self) -> Option<&DeviceSettings> {
        self.settings.as_ref()
    }

    /// GPS fix from the most recent GPS packet.
    pub fn gps(&self) -> Option<&GpsFix> {
        self.gps.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            resyncs: self.reader.resync_count(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn stream_mut(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(SessionError::StreamUnavailable)
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let body = loralink_packet::encode(packet);
        let stream = self.stream.as_mut().ok_or(SessionError::StreamUnavailable)?;
        let wire_len = self.writer.write(stream, &body)?;
        self.stats.transmitted += 1;
        debug!(packet_type = %packet.packet_type(), wire_len, "sent packet");
        Ok(())
    }
}

impl<S: DeviceStream> fmt::Debug for DeviceSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<PacketType> = self.handlers.keys().copied().collect();
        handlers.sort_by_key(|packet_type| packet_type.name());
        f.debug_struct("DeviceSession")
            .field("attached", &self.is_attached())
            .field("buffered", &self.reader.buffered_len())
            .field("settings", &self.settings)
            .field("gps", &self.gps)
            .field("stats", &self.stats())
            .field("handlers", &handlers)
            .finish()
    }
}
