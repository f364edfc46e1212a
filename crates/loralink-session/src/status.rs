use std::fmt;

use loralink_packet::{DeviceSettings, GpsFix};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Outcome of a status request. Either field may be missing when the
/// device did not answer before the deadline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    pub settings: Option<DeviceSettings>,
    pub gps: Option<GpsFix>,
}

impl StatusReport {
    /// Both settings and GPS fix were received.
    pub fn is_complete(&self) -> bool {
        self.settings.is_some() && self.gps.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_none() && self.gps.is_none()
    }

    /// Operator-facing `(label, value)` rows for the settings, in display order.
    pub fn settings_rows(&self) -> Vec<(&'static str, String)> {
        let Some(settings) = &self.settings else {
            return Vec::new();
        };
        vec![
            ("Frequency", float_text(settings.frequency)),
            ("Power", settings.power.to_string()),
            ("Bandwidth", float_text(settings.bandwidth)),
            ("Spreading Factor", settings.spreading_factor.to_string()),
            ("Coding Rate", settings.coding_rate.to_string()),
            ("Preamble", settings.preamble.to_string()),
            ("CRC Enabled", settings.crc_enabled.to_string()),
            ("Sync Word", sync_word_hex(settings.sync_word)),
        ]
    }

    /// Operator-facing `(label, value)` rows for the GPS fix.
    pub fn gps_rows(&self) -> Vec<(&'static str, String)> {
        let Some(gps) = &self.gps else {
            return Vec::new();
        };
        vec![
            ("Latitude", float_text(gps.latitude)),
            ("Longitude", float_text(gps.longitude)),
            ("Satellites", gps.satellites.to_string()),
        ]
    }
}

// Floats keep a fractional part so `915.0` does not read as an integer.
fn float_text(value: impl fmt::Display) -> String {
    let text = value.to_string();
    if text.contains(['.', 'i', 'N']) {
        text
    } else {
        format!("{text}.0")
    }
}

fn sync_word_hex(sync_word: u32) -> String {
    format!("{sync_word:#x}")
}

struct SettingsView<'a>(&'a DeviceSettings);

impl Serialize for SettingsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let settings = self.0;
        let mut state = serializer.serialize_struct("Settings", 8)?;
        state.serialize_field("Frequency", &settings.frequency)?;
        state.serialize_field("Power", &settings.power)?;
        state.serialize_field("Bandwidth", &settings.bandwidth)?;
        state.serialize_field("Spreading Factor", &settings.spreading_factor)?;
        state.serialize_field("Coding Rate", &settings.coding_rate)?;
        state.serialize_field("Preamble", &settings.preamble)?;
        state.serialize_field("CRC Enabled", &settings.crc_enabled)?;
        state.serialize_field("Sync Word", &sync_word_hex(settings.sync_word))?;
        state.end()
    }
}

struct GpsView<'a>(&'a GpsFix);

impl Serialize for GpsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let gps = self.0;
        let mut state = serializer.serialize_struct("Gps", 3)?;
        state.serialize_field("Latitude", &gps.latitude)?;
        state.serialize_field("Longitude", &gps.longitude)?;
        state.serialize_field("Satellites", &gps.satellites)?;
        state.end()
    }
}

impl Serialize for StatusReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StatusReport", 3)?;
        state.serialize_field("complete", &self.is_complete())?;
        state.serialize_field("settings", &self.settings.as_ref().map(SettingsView))?;
        state.serialize_field("gps", &self.gps.as_ref().map(GpsView))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness() {
        let mut report = StatusReport::default();
        assert!(report.is_empty());
        assert!(!report.is_complete());

        report.settings = Some(DeviceSettings::default());
        assert!(!report.is_empty());
        assert!(!report.is_complete());

        report.gps = Some(GpsFix::default());
        assert!(report.is_complete());
    }

    #[test]
    fn serializes_display_keys() {
        let report = StatusReport {
            settings: Some(DeviceSettings::default()),
            gps: Some(GpsFix {
                latitude: 45.5,
                longitude: -73.25,
                satellites: 7,
            }),
        };
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["complete"], true);
        assert_eq!(value["settings"]["Frequency"], 915.0);
        assert_eq!(value["settings"]["Power"], 22);
        assert_eq!(value["settings"]["Spreading Factor"], 7);
        assert_eq!(value["settings"]["CRC Enabled"], true);
        assert_eq!(value["settings"]["Sync Word"], "0xab");
        assert_eq!(value["gps"]["Latitude"], 45.5);
        assert_eq!(value["gps"]["Satellites"], 7);
    }

    #[test]
    fn partial_report_serializes_null() {
        let report = StatusReport {
            settings: None,
            gps: Some(GpsFix::default()),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["complete"], false);
        assert!(value["settings"].is_null());
        assert!(value["gps"].is_object());
    }

    #[test]
    fn rows_follow_display_order() {
        let report = StatusReport {
            settings: Some(DeviceSettings::default()),
            gps: None,
        };
        let labels: Vec<&str> = report.settings_rows().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels.first(), Some(&"Frequency"));
        assert_eq!(labels.last(), Some(&"Sync Word"));
        assert_eq!(report.settings_rows()[7].1, "0xab");
        assert!(report.gps_rows().is_empty());
    }

    #[test]
    fn float_rows_keep_fraction() {
        let report = StatusReport {
            settings: Some(DeviceSettings::default()),
            gps: Some(GpsFix {
                latitude: 45.0,
                longitude: -73.25,
                satellites: 7,
            }),
        };
        let settings = report.settings_rows();
        assert_eq!(settings[0], ("Frequency", "915.0".to_string()));
        assert_eq!(settings[1].1, "22");
        assert_eq!(settings[2], ("Bandwidth", "500.0".to_string()));

        let gps = report.gps_rows();
        assert_eq!(gps[0].1, "45.0");
        assert_eq!(gps[1].1, "-73.25");
        assert_eq!(gps[2].1, "7");

        assert_eq!(float_text(868.1f32), "868.1");
        assert_eq!(float_text(f32::INFINITY), "inf");
    }
}
