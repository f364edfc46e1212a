use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Crates whose events follow `--log-level`.
const LINK_TARGETS: [&str; 6] = [
    "loralink",
    "loralink_transport",
    "loralink_frame",
    "loralink_packet",
    "loralink_signals",
    "loralink_session",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Per-frame events (resyncs, dropped frames) name their crate once the
    /// operator goes below info.
    fn shows_target(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Trace)
    }
}

/// Link crates log at `level`; anything else (serial driver, runtime) is held
/// to warnings unless `level` is stricter.
fn link_filter(level: LogLevel) -> Targets {
    let link = level.as_filter();
    Targets::new()
        .with_targets(LINK_TARGETS.map(|target| (target, link)))
        .with_default(link.min(LevelFilter::WARN))
}

/// Install the stderr subscriber. Stdout carries command output only, so
/// `receive` can be piped while logging.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = link_filter(level);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(level.shows_target());

    match format {
        LogFormat::Text => {
            let _ = tracing_subscriber::registry()
                .with(layer.with_filter(filter))
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::registry()
                .with(layer.json().with_filter(filter))
                .try_init();
        }
    }
}
