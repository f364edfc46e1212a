use prost::Message;

use crate::error::{DecodeError, Result};
use crate::packet::{
    DeviceSettings, DeviceState, GpsFix, LogRecord, Packet, PacketType, Request, Transmission,
};
use crate::wire::{
    WireGps, WireLog, WirePacket, WireRequest, WireSettings, WireState, WireTransmission,
    WireType,
};

/// Serialize a packet to its wire body (without frame markers).
pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut wire = WirePacket::default();
    match packet {
        Packet::Transmission(t) => {
            wire.kind = WireType::Transmission as i32;
            wire.transmission = Some(WireTransmission {
                payload: t.payload.clone(),
            });
        }
        Packet::Settings(s) => {
            wire.kind = WireType::Settings as i32;
            wire.settings = Some(WireSettings {
                frequency: s.frequency,
                power: s.power,
                bandwidth: s.bandwidth,
                spreading_factor: s.spreading_factor,
                coding_rate: s.coding_rate,
                preamble: s.preamble,
                set_crc: s.crc_enabled,
                sync_word: s.sync_word,
            });
        }
        Packet::Request(r) => {
            wire.kind = WireType::Request as i32;
            wire.request = Some(WireRequest {
                settings: r.settings,
                gps: r.gps,
                state_change: r.state_change.map(|state| WireState::from(state) as i32),
            });
        }
        Packet::Gps(g) => {
            wire.kind = WireType::Gps as i32;
            wire.gps = Some(WireGps {
                latitude: g.latitude,
                longitude: g.longitude,
                satellites: g.satellites,
            });
        }
        Packet::Log(l) => {
            wire.kind = WireType::Log as i32;
            wire.log = Some(WireLog {
                payload: l.payload.clone(),
                rssi_avg: l.rssi_avg,
                snr: l.snr,
                crc_error: l.crc_error,
                general_error: l.general_error,
            });
        }
    }
    wire.encode_to_vec()
}

/// Parse a wire body into a packet.
///
/// Never panics: empty, truncated, or unrecognized bodies come back as
/// [`DecodeError`] so the caller can log and move on to the next frame.
pub fn decode(body: &[u8]) -> Result<Packet> {
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }

    let wire = WirePacket::decode(body)?;
    let kind = WireType::try_from(wire.kind).map_err(|_| DecodeError::UnknownType(wire.kind))?;

    let packet = match kind {
        WireType::Transmission => {
            let t = wire
                .transmission
                .ok_or(DecodeError::MissingBody(PacketType::Transmission))?;
            Packet::Transmission(Transmission { payload: t.payload })
        }
        WireType::Settings => {
            let s = wire
                .settings
                .ok_or(DecodeError::MissingBody(PacketType::Settings))?;
            Packet::Settings(DeviceSettings {
                frequency: s.frequency,
                power: s.power,
                bandwidth: s.bandwidth,
                spreading_factor: s.spreading_factor,
                coding_rate: s.coding_rate,
                preamble: s.preamble,
                crc_enabled: s.set_crc,
                sync_word: s.sync_word,
            })
        }
        WireType::Request => {
            let r = wire
                .request
                .ok_or(DecodeError::MissingBody(PacketType::Request))?;
            let state_change = match r.state_change {
                Some(raw) => Some(
                    WireState::try_from(raw)
                        .map_err(|_| DecodeError::UnknownState(raw))?
                        .into(),
                ),
                None => None,
            };
            Packet::Request(Request {
                settings: r.settings,
                gps: r.gps,
                state_change,
            })
        }
        WireType::Gps => {
            let g = wire.gps.ok_or(DecodeError::MissingBody(PacketType::Gps))?;
            Packet::Gps(GpsFix {
                latitude: g.latitude,
                longitude: g.longitude,
                satellites: g.satellites,
            })
        }
        WireType::Log => {
            let l = wire.log.ok_or(DecodeError::MissingBody(PacketType::Log))?;
            Packet::Log(LogRecord {
                payload: l.payload,
                rssi_avg: l.rssi_avg,
                snr: l.snr,
                crc_error: l.crc_error,
                general_error: l.general_error,
            })
        }
    };

    Ok(packet)
}

impl From<DeviceState> for WireState {
    fn from(state: DeviceState) -> Self {
        match state {
            DeviceState::Standby => WireState::Standby,
            DeviceState::Receiver => WireState::Receiver,
            DeviceState::Transmitter => WireState::Transmitter,
        }
    }
}

impl From<WireState> for DeviceState {
    fn from(state: WireState) -> Self {
        match state {
            WireState::Standby => DeviceState::Standby,
            WireState::Receiver => DeviceState::Receiver,
            WireState::Transmitter => DeviceState::Transmitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(packet: Packet) {
        let body = encode(&packet);
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn roundtrip_transmission() {
        roundtrip(Packet::Transmission(Transmission {
            payload: b"hello radio".to_vec(),
        }));
        roundtrip(Packet::Transmission(Transmission::default()));
    }

    #[test]
    fn roundtrip_settings() {
        roundtrip(Packet::Settings(DeviceSettings::default()));
        roundtrip(Packet::Settings(DeviceSettings {
            frequency: 868.1,
            power: -3,
            bandwidth: 125.0,
            spreading_factor: 12,
            coding_rate: 8,
            preamble: 16,
            crc_enabled: false,
            sync_word: 0x12,
        }));
    }

    #[test]
    fn roundtrip_requests() {
        roundtrip(Packet::Request(Request::settings()));
        roundtrip(Packet::Request(Request::gps()));
        roundtrip(Packet::Request(Request::state_change(DeviceState::Receiver)));
        roundtrip(Packet::Request(Request::state_change(DeviceState::Standby)));
        roundtrip(Packet::Request(Request::default()));
    }

    #[test]
    fn roundtrip_gps() {
        roundtrip(Packet::Gps(GpsFix {
            latitude: 48.858_37,
            longitude: -2.294_48,
            satellites: 9,
        }));
    }

    #[test]
    fn roundtrip_log() {
        roundtrip(Packet::Log(LogRecord {
            payload: vec![0x00, 0x00, 0x01, 0x00, 0x10, 0x27],
            rssi_avg: -97.5,
            snr: 7.25,
            crc_error: true,
            general_error: false,
        }));
    }

    #[test]
    fn empty_body_fails() {
        assert!(matches!(decode(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn truncated_body_fails() {
        let body = encode(&Packet::Settings(DeviceSettings::default()));
        let result = decode(&body[..body.len() - 1]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn garbage_body_fails() {
        assert!(matches!(
            decode(&[0xFF, 0xFF, 0xFF]),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_type_fails() {
        let body = WirePacket {
            kind: 42,
            ..WirePacket::default()
        }
        .encode_to_vec();
        assert!(matches!(decode(&body), Err(DecodeError::UnknownType(42))));
    }

    #[test]
    fn unknown_state_fails() {
        let body = WirePacket {
            kind: WireType::Request as i32,
            request: Some(WireRequest {
                settings: false,
                gps: false,
                state_change: Some(9),
            }),
            ..WirePacket::default()
        }
        .encode_to_vec();
        assert!(matches!(decode(&body), Err(DecodeError::UnknownState(9))));
    }

    #[test]
    fn tag_without_body_fails() {
        let body = WirePacket {
            kind: WireType::Log as i32,
            ..WirePacket::default()
        }
        .encode_to_vec();
        assert!(matches!(
            decode(&body),
            Err(DecodeError::MissingBody(PacketType::Log))
        ));
    }

    #[test]
    fn type_tag_wins_over_extra_bodies() {
        let body = WirePacket {
            kind: WireType::Gps as i32,
            gps: Some(WireGps {
                latitude: 1.0,
                longitude: 2.0,
                satellites: 3,
            }),
            settings: Some(WireSettings::default()),
            ..WirePacket::default()
        }
        .encode_to_vec();
        assert_eq!(decode(&body).unwrap().packet_type(), PacketType::Gps);
    }
}
