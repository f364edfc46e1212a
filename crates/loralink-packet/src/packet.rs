use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable type tag of a [`Packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PacketType {
    Transmission,
    Settings,
    Request,
    Gps,
    Log,
}

impl PacketType {
    /// Upper-case protocol name of the type.
    pub fn name(self) -> &'static str {
        match self {
            PacketType::Transmission => "TRANSMISSION",
            PacketType::Settings => "SETTINGS",
            PacketType::Request => "REQUEST",
            PacketType::Gps => "GPS",
            PacketType::Log => "LOG",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operating state the device can be commanded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Standby,
    Receiver,
    Transmitter,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceState::Standby => "STANDBY",
            DeviceState::Receiver => "RECEIVER",
            DeviceState::Transmitter => "TRANSMITTER",
        };
        f.write_str(name)
    }
}

/// Radio configuration reported by (or sent to) the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Carrier frequency.
    pub frequency: f32,
    /// Transmit power in dBm.
    pub power: i32,
    /// Bandwidth in kHz.
    pub bandwidth: f32,
    pub spreading_factor: u32,
    pub coding_rate: u32,
    /// Preamble length in symbols.
    pub preamble: u32,
    pub crc_enabled: bool,
    pub sync_word: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            frequency: 915.0,
            power: 22,
            bandwidth: 500.0,
            spreading_factor: 7,
            coding_rate: 5,
            preamble: 8,
            crc_enabled: true,
            sync_word: 0xAB,
        }
    }
}

/// Last GPS fix reported by the device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub satellites: u32,
}

/// Raw payload to be radiated by the device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transmission {
    pub payload: Vec<u8>,
}

/// Query or command sent to the device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    /// Ask the device to reply with a SETTINGS packet.
    pub settings: bool,
    /// Ask the device to reply with a GPS packet.
    pub gps: bool,
    /// Command the device into a new state.
    pub state_change: Option<DeviceState>,
}

impl Request {
    /// Request the current settings.
    pub fn settings() -> Self {
        Self {
            settings: true,
            ..Self::default()
        }
    }

    /// Request the current GPS fix.
    pub fn gps() -> Self {
        Self {
            gps: true,
            ..Self::default()
        }
    }

    /// Command a state change.
    pub fn state_change(state: DeviceState) -> Self {
        Self {
            state_change: Some(state),
            ..Self::default()
        }
    }
}

/// A payload the device received over the air, with link quality.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogRecord {
    /// Received bytes: 4-byte big-endian CAN identifier followed by data.
    pub payload: Vec<u8>,
    /// Average received signal strength in dBm.
    pub rssi_avg: f32,
    /// Signal-to-noise ratio in dB.
    pub snr: f32,
    pub crc_error: bool,
    pub general_error: bool,
}

/// A protocol message. Exactly one variant per type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Transmission(Transmission),
    Settings(DeviceSettings),
    Request(Request),
    Gps(GpsFix),
    Log(LogRecord),
}

impl Packet {
    /// The type tag of this packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Transmission(_) => PacketType::Transmission,
            Packet::Settings(_) => PacketType::Settings,
            Packet::Request(_) => PacketType::Request,
            Packet::Gps(_) => PacketType::Gps,
            Packet::Log(_) => PacketType::Log,
        }
    }
}

impl From<Transmission> for Packet {
    fn from(value: Transmission) -> Self {
        Packet::Transmission(value)
    }
}

impl From<DeviceSettings> for Packet {
    fn from(value: DeviceSettings) -> Self {
        Packet::Settings(value)
    }
}

impl From<Request> for Packet {
    fn from(value: Request) -> Self {
        Packet::Request(value)
    }
}

impl From<GpsFix> for Packet {
    fn from(value: GpsFix) -> Self {
        Packet::Gps(value)
    }
}

impl From<LogRecord> for Packet {
    fn from(value: LogRecord) -> Self {
        Packet::Log(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_type_tags() {
        assert_eq!(
            Packet::from(Request::gps()).packet_type(),
            PacketType::Request
        );
        assert_eq!(
            Packet::from(LogRecord::default()).packet_type(),
            PacketType::Log
        );
        assert_eq!(PacketType::Gps.to_string(), "GPS");
    }

    #[test]
    fn request_constructors_set_one_field() {
        assert_eq!(
            Request::settings(),
            Request {
                settings: true,
                gps: false,
                state_change: None
            }
        );
        assert_eq!(
            Request::state_change(DeviceState::Standby).state_change,
            Some(DeviceState::Standby)
        );
    }

    #[test]
    fn settings_defaults_match_operator_defaults() {
        let settings = DeviceSettings::default();
        assert_eq!(settings.frequency, 915.0);
        assert_eq!(settings.power, 22);
        assert_eq!(settings.sync_word, 0xAB);
        assert!(settings.crc_enabled);
    }

    #[test]
    fn settings_serialize_as_json_object() {
        let value = serde_json::to_value(DeviceSettings::default()).unwrap();
        assert_eq!(value["spreading_factor"], 7);
        assert_eq!(value["crc_enabled"], true);
    }
}
