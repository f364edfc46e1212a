use std::thread;
use std::time::Duration;

use loralink_packet::DeviceState;
use loralink_session::{SessionConfig, StopSignal, TelemetryQueue};
use loralink_signals::{SignalDatabase, TelemetryDecoder};
use tracing::info;

use crate::cmd::ReceiveArgs;
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_telemetry, OutputFormat};

const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let database = match &args.database {
        Some(path) => SignalDatabase::load_or_empty(path),
        None => SignalDatabase::empty(),
    };
    let decoder = TelemetryDecoder::new(database);
    let queue = TelemetryQueue::new();

    let mut session = args.connect.open(SessionConfig::default())?;
    session
        .change_state(DeviceState::Receiver)
        .map_err(|err| session_error("state change failed", err))?;

    let handle = session.spawn_receiver(decoder, queue.clone());
    let stop = handle.stop_signal();
    install_ctrlc_handler(stop.clone())?;

    let mut printed = 0usize;
    let limit_reached = |printed: usize| args.count.is_some_and(|count| printed >= count);

    'drain: while !stop.is_triggered() && !handle.is_finished() {
        for record in queue.drain() {
            print_telemetry(&record, format);
            printed = printed.saturating_add(1);
            if limit_reached(printed) {
                break 'drain;
            }
        }
        thread::sleep(DRAIN_INTERVAL);
    }

    let interrupted = stop.is_triggered();
    let session = handle
        .stop()
        .map_err(|err| session_error("receiver shutdown failed", err))?;

    if !limit_reached(printed) {
        for record in queue.drain() {
            print_telemetry(&record, format);
            printed = printed.saturating_add(1);
            if limit_reached(printed) {
                break;
            }
        }
    }

    info!(printed, stats = ?session.stats(), "receive finished");

    if !interrupted && !limit_reached(printed) {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "receive loop stopped unexpectedly",
        ));
    }
    Ok(SUCCESS)
}

fn install_ctrlc_handler(stop: StopSignal) -> CliResult<()> {
    ctrlc::set_handler(move || stop.trigger())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
