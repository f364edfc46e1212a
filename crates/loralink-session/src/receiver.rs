use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use loralink_packet::{DeviceState, LogRecord, Packet};
use loralink_signals::{DecodedTelemetry, TelemetryDecoder};
use loralink_transport::DeviceStream;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{Result, SessionError};
use crate::session::DeviceSession;

/// A decoded LOG packet with its link-quality fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Reception time, unix seconds.
    pub timestamp: f64,
    pub rssi: f32,
    pub snr: f32,
    pub crc_error: bool,
    pub general_error: bool,
    #[serde(flatten)]
    pub telemetry: DecodedTelemetry,
}

impl TelemetryRecord {
    /// Decode `log`'s payload and stamp it with the current time.
    pub fn from_log(log: &LogRecord, decoder: &TelemetryDecoder) -> Self {
        Self {
            timestamp: unix_now(),
            rssi: log.rssi_avg,
            snr: log.snr,
            crc_error: log.crc_error,
            general_error: log.general_error,
            telemetry: decoder.decode_payload(&log.payload),
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

/// Shared, lock-guarded buffer of telemetry records.
///
/// Clones share the same buffer. The receive loop pushes; a consumer
/// drains.
#[derive(Debug, Clone, Default)]
pub struct TelemetryQueue {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl TelemetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: TelemetryRecord) {
        self.lock().push(record);
    }

    /// Take every queued record, leaving the queue empty.
    pub fn drain(&self) -> Vec<TelemetryRecord> {
        std::mem::take(&mut *self.lock())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TelemetryRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cooperative stop flag for the receive loop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl<S: DeviceStream> DeviceSession<S> {
    /// Stream telemetry into `queue` until `stop` is triggered.
    ///
    /// LOG packets become [`TelemetryRecord`]s; other packets only reach
    /// registered handlers. The stop flag is checked at least once per poll
    /// interval. On exit the device is always asked to return to standby.
    pub fn run_receive_loop(
        &mut self,
        stop: &StopSignal,
        decoder: &TelemetryDecoder,
        queue: &TelemetryQueue,
    ) -> Result<()> {
        info!("receive loop started");
        let result = self.receive_until_stopped(stop, decoder, queue);

        if let Err(err) = self.change_state(DeviceState::Standby) {
            warn!(error = %err, "failed to return device to standby");
        }
        info!(stats = ?self.stats(), "receive loop stopped");
        result
    }

    fn receive_until_stopped(
        &mut self,
        stop: &StopSignal,
        decoder: &TelemetryDecoder,
        queue: &TelemetryQueue,
    ) -> Result<()> {
        while !stop.is_triggered() {
            if self.bytes_available()? == 0 {
                thread::sleep(self.config().poll_interval);
                continue;
            }
            self.process_one_frame(|packet| {
                if let Packet::Log(log) = packet {
                    queue.push(TelemetryRecord::from_log(log, decoder));
                }
                ControlFlow::Continue(())
            })?;
        }
        Ok(())
    }
}

impl<S: DeviceStream + 'static> DeviceSession<S> {
    /// Move the session onto a worker thread running the receive loop.
    pub fn spawn_receiver(
        self,
        decoder: TelemetryDecoder,
        queue: TelemetryQueue,
    ) -> ReceiverHandle<S> {
        let stop = StopSignal::new();
        let worker_stop = stop.clone();
        let mut session = self;
        let thread = thread::spawn(move || {
            if let Err(err) = session.run_receive_loop(&worker_stop, &decoder, &queue) {
                error!(error = %err, "receive loop failed");
            }
            session
        });

        ReceiverHandle {
            stop,
            thread: Some(thread),
        }
    }
}

/// Owner of a running receive loop. Stopping it returns the session.
#[derive(Debug)]
pub struct ReceiverHandle<S: DeviceStream> {
    stop: StopSignal,
    thread: Option<JoinHandle<DeviceSession<S>>>,
}

impl<S: DeviceStream> ReceiverHandle<S> {
    /// A clone of the loop's stop flag, e.g. for a Ctrl-C handler.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// The loop has exited (stopped or failed).
    pub fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .map_or(true, |thread| thread.is_finished())
    }

    /// Stop the loop, wait for it to exit, and take the session back.
    pub fn stop(mut self) -> Result<DeviceSession<S>> {
        self.stop.trigger();
        let thread = self.thread.take().ok_or(SessionError::Join)?;
        thread.join().map_err(|_| SessionError::Join)
    }
}

impl<S: DeviceStream> Drop for ReceiverHandle<S> {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.stop.trigger();
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bytes::BytesMut;
    use loralink_frame::{encode_frame, FrameConfig, FrameReader};
    use loralink_packet::{Request, Transmission};
    use loralink_signals::{MessageSchema, SignalDatabase, SignalDefinition};
    use loralink_transport::MemoryStream;

    use super::*;
    use crate::config::SessionConfig;

    fn frame(packet: &Packet) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(
            &loralink_packet::encode(packet),
            &FrameConfig::default(),
            &mut buf,
        )
        .unwrap();
        buf.to_vec()
    }

    fn log(payload: &[u8], rssi: f32) -> Packet {
        Packet::Log(LogRecord {
            payload: payload.to_vec(),
            rssi_avg: rssi,
            snr: 9.5,
            crc_error: false,
            general_error: false,
        })
    }

    fn decoder() -> TelemetryDecoder {
        let database = SignalDatabase::from_messages([MessageSchema {
            identifier: 0x42,
            name: "Speed".to_string(),
            length: 1,
            signals: vec![SignalDefinition {
                unit: Some("km/h".to_string()),
                ..SignalDefinition::new("Value", 0, 8)
            }],
        }])
        .unwrap();
        TelemetryDecoder::new(database)
    }

    fn wait_for(queue: &TelemetryQueue, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while queue.len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn record_carries_link_quality_and_decode() {
        let record = TelemetryRecord::from_log(
            &LogRecord {
                payload: vec![0, 0, 0, 0x42, 88],
                rssi_avg: -80.5,
                snr: 6.25,
                crc_error: true,
                general_error: false,
            },
            &decoder(),
        );
        assert!(record.timestamp > 0.0);
        assert_eq!(record.rssi, -80.5);
        assert!(record.crc_error);
        assert_eq!(record.telemetry.message_name, "Speed");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["rssi"], -80.5);
        assert_eq!(value["snr"], 6.25);
        assert_eq!(value["can_id"], 0x42);
        assert_eq!(value["signals"]["Value"], "88 km/h");
        assert_eq!(value["raw_data"], "58");
        assert!(value.get("decode_error").is_none());
    }

    #[test]
    fn queue_drain_takes_everything() {
        let queue = TelemetryQueue::new();
        let record = TelemetryRecord::from_log(&LogRecord::default(), &decoder());
        queue.push(record.clone());
        queue.push(record);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain().len(), 2);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());

        queue.push(TelemetryRecord::from_log(&LogRecord::default(), &decoder()));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_push_and_drain_loses_nothing() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;

        let queue = TelemetryQueue::new();
        let decoder = decoder();
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let queue = queue.clone();
                let decoder = decoder.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut record =
                            TelemetryRecord::from_log(&LogRecord::default(), &decoder);
                        record.rssi = (producer * PER_PRODUCER + i) as f32;
                        queue.push(record);
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        let total = PRODUCERS * PER_PRODUCER;
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.len() < total && Instant::now() < deadline {
            seen.extend(queue.drain().into_iter().map(|record| record.rssi as usize));
        }
        for producer in producers {
            producer.join().unwrap();
        }
        seen.extend(queue.drain().into_iter().map(|record| record.rssi as usize));

        seen.sort_unstable();
        let expected: Vec<usize> = (0..total).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn stop_signal_is_shared() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_triggered());
        signal.trigger();
        assert!(clone.is_triggered());
    }

    #[test]
    fn receive_loop_queues_logs_and_returns_to_standby() {
        let (host, mut device) = MemoryStream::pair();
        let session = DeviceSession::with_config(host, SessionConfig::immediate());
        let queue = TelemetryQueue::new();

        let handle = session.spawn_receiver(decoder(), queue.clone());
        device
            .write_all(&frame(&log(&[0, 0, 0, 0x42, 10], -70.0)))
            .unwrap();
        device
            .write_all(&frame(&Packet::Transmission(Transmission {
                payload: b"ignored".to_vec(),
            })))
            .unwrap();
        device.write_all(&frame(&log(&[0x01], -71.0))).unwrap();
        wait_for(&queue, 2);

        let session = handle.stop().unwrap();
        let records = queue.drain();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].telemetry.signal("Value").map(ToString::to_string),
            Some("10 km/h".to_string())
        );
        assert_eq!(
            records[1].telemetry.error.as_deref(),
            Some("Payload too short")
        );
        assert_eq!(session.stats().received, 3);

        let mut reader = FrameReader::new();
        reader.feed(&device.take_available());
        let body = reader.next_frame().unwrap();
        assert_eq!(
            loralink_packet::decode(&body).unwrap(),
            Packet::Request(Request::state_change(DeviceState::Standby))
        );
    }

    #[test]
    fn receive_loop_honors_stop_while_idle() {
        let (host, _device) = MemoryStream::pair();
        let mut session = DeviceSession::with_config(host, SessionConfig::immediate());
        let stop = StopSignal::new();
        stop.trigger();

        session
            .run_receive_loop(&stop, &decoder(), &TelemetryQueue::new())
            .unwrap();
        assert_eq!(session.stats().transmitted, 1);
    }

    #[test]
    fn receive_loop_without_stream_fails() {
        let mut session: DeviceSession<MemoryStream> = DeviceSession::detached();
        let result = session.run_receive_loop(
            &StopSignal::new(),
            &decoder(),
            &TelemetryQueue::new(),
        );
        assert!(matches!(result, Err(SessionError::StreamUnavailable)));
    }

    #[test]
    fn dropping_handle_stops_worker() {
        let (host, _device) = MemoryStream::pair();
        let session = DeviceSession::with_config(host, SessionConfig::immediate());
        let handle = session.spawn_receiver(decoder(), TelemetryQueue::new());
        let stop = handle.stop_signal();
        drop(handle);
        assert!(stop.is_triggered());
    }
}
