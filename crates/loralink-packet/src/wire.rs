//! Protobuf messages as the device firmware encodes them.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireType {
    Transmission = 0,
    Settings = 1,
    Request = 2,
    Gps = 3,
    Log = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireState {
    Standby = 0,
    Receiver = 1,
    Transmitter = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WirePacket {
    #[prost(enumeration = "WireType", tag = "1")]
    pub kind: i32,
    #[prost(message, optional, tag = "2")]
    pub transmission: Option<WireTransmission>,
    #[prost(message, optional, tag = "3")]
    pub settings: Option<WireSettings>,
    #[prost(message, optional, tag = "4")]
    pub request: Option<WireRequest>,
    #[prost(message, optional, tag = "5")]
    pub gps: Option<WireGps>,
    #[prost(message, optional, tag = "6")]
    pub log: Option<WireLog>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireTransmission {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireSettings {
    #[prost(float, tag = "1")]
    pub frequency: f32,
    #[prost(int32, tag = "2")]
    pub power: i32,
    #[prost(float, tag = "3")]
    pub bandwidth: f32,
    #[prost(uint32, tag = "4")]
    pub spreading_factor: u32,
    #[prost(uint32, tag = "5")]
    pub coding_rate: u32,
    #[prost(uint32, tag = "6")]
    pub preamble: u32,
    #[prost(bool, tag = "7")]
    pub set_crc: bool,
    #[prost(uint32, tag = "8")]
    pub sync_word: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireRequest {
    #[prost(bool, tag = "1")]
    pub settings: bool,
    #[prost(bool, tag = "2")]
    pub gps: bool,
    #[prost(enumeration = "WireState", optional, tag = "3")]
    pub state_change: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireGps {
    #[prost(double, tag = "1")]
    pub latitude: f64,
    #[prost(double, tag = "2")]
    pub longitude: f64,
    #[prost(uint32, tag = "3")]
    pub satellites: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireLog {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
    #[prost(float, tag = "2")]
    pub rssi_avg: f32,
    #[prost(float, tag = "3")]
    pub snr: f32,
    #[prost(bool, tag = "4")]
    pub crc_error: bool,
    #[prost(bool, tag = "5")]
    pub general_error: bool,
}
