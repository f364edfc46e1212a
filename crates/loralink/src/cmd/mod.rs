use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use loralink_packet::{DeviceSettings, DeviceState};
use loralink_session::{DeviceSession, SessionConfig};
use loralink_transport::{SerialConfig, SerialStream, DEFAULT_BAUD_RATE};

use crate::exit::{session_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod configure;
pub mod decode;
pub mod receive;
pub mod state;
pub mod status;
pub mod transmit;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query the device settings and GPS fix.
    Status(StatusArgs),
    /// Apply radio settings, then print the reported status.
    Configure(ConfigureArgs),
    /// Command the device into a new state.
    State(StateArgs),
    /// Send a payload for the device to radiate.
    Transmit(TransmitArgs),
    /// Stream received telemetry until interrupted.
    Receive(ReceiveArgs),
    /// Decode a telemetry payload offline against a signal database.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Status(args) => status::run(args, format),
        Command::Configure(args) => configure::run(args, format),
        Command::State(args) => state::run(args, format),
        Command::Transmit(args) => transmit::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Serial port of the device (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, short = 'p', env = "LORALINK_PORT")]
    pub port: String,
    /// Serial line speed.
    #[arg(long, env = "LORALINK_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

impl ConnectArgs {
    pub fn open(&self, config: SessionConfig) -> CliResult<DeviceSession<SerialStream>> {
        let serial = SerialConfig {
            baud_rate: self.baud,
            ..SerialConfig::default()
        };
        let stream = SerialStream::open_with_config(&self.port, &serial)
            .map_err(|err| transport_error("connect failed", err))?;
        Ok(DeviceSession::with_config(stream, config))
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Time to wait for both replies (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Carrier frequency in MHz.
    #[arg(long, default_value_t = DeviceSettings::default().frequency)]
    pub frequency: f32,
    /// Transmit power in dBm.
    #[arg(long, default_value_t = DeviceSettings::default().power, allow_negative_numbers = true)]
    pub power: i32,
    /// Bandwidth in kHz.
    #[arg(long, default_value_t = DeviceSettings::default().bandwidth)]
    pub bandwidth: f32,
    #[arg(long, default_value_t = DeviceSettings::default().spreading_factor)]
    pub spreading_factor: u32,
    #[arg(long, default_value_t = DeviceSettings::default().coding_rate)]
    pub coding_rate: u32,
    /// Preamble length in symbols.
    #[arg(long, default_value_t = DeviceSettings::default().preamble)]
    pub preamble: u32,
    /// Disable the payload CRC.
    #[arg(long)]
    pub no_crc: bool,
    /// Sync word, hex (0xAB) or decimal.
    #[arg(long, default_value = "0xAB", value_parser = parse_sync_word)]
    pub sync_word: u32,
    /// Time to wait for the status reply after applying (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl ConfigureArgs {
    pub fn settings(&self) -> DeviceSettings {
        DeviceSettings {
            frequency: self.frequency,
            power: self.power,
            bandwidth: self.bandwidth,
            spreading_factor: self.spreading_factor,
            coding_rate: self.coding_rate,
            preamble: self.preamble,
            crc_enabled: !self.no_crc,
            sync_word: self.sync_word,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StateName {
    Standby,
    Receiver,
    Transmitter,
}

impl From<StateName> for DeviceState {
    fn from(value: StateName) -> Self {
        match value {
            StateName::Standby => DeviceState::Standby,
            StateName::Receiver => DeviceState::Receiver,
            StateName::Transmitter => DeviceState::Transmitter,
        }
    }
}

#[derive(Args, Debug)]
pub struct StateArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Target state.
    #[arg(value_enum)]
    pub state: StateName,
}

#[derive(Args, Debug)]
pub struct TransmitArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (e.g. "00 00 02 00 e8 03").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Signal database (.dbc or .json). Unknown frames are shown raw without one.
    #[arg(long, env = "LORALINK_DATABASE")]
    pub database: Option<PathBuf>,
    /// Stop after printing this many records.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Signal database (.dbc or .json).
    #[arg(long, env = "LORALINK_DATABASE")]
    pub database: PathBuf,
    /// Payload in hex: 4-byte big-endian identifier followed by data.
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Parse a hex string, tolerating whitespace, `:` separators and a `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "hex payload has an odd number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).unwrap_or("??");
            u8::from_str_radix(text, 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex byte: {text}")))
        })
        .collect()
}

fn parse_sync_word(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid sync word {input:?}: {err}"))
}

pub(crate) fn status_code(report: &loralink_session::StatusReport) -> i32 {
    if report.is_complete() {
        crate::exit::SUCCESS
    } else {
        crate::exit::TIMEOUT
    }
}

pub(crate) fn request_status(
    session: &mut DeviceSession<SerialStream>,
    timeout: Duration,
) -> CliResult<loralink_session::StatusReport> {
    session
        .request_status(timeout)
        .map_err(|err| session_error("status request failed", err))
}
