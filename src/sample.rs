//! Decoded physiological sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reading reconstructed from a 5-byte packet.
///
/// The timestamp is assigned by the decoder when the packet is decoded; it
/// is not transmitted by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Signal strength, 0..=15.
    pub signal_strength: u8,
    /// Sensor reports a usable signal.
    pub has_signal: bool,
    /// Probe is disconnected from the device.
    pub probe_unplugged: bool,
    /// Beep flag, set on a detected pulse.
    pub pulse_beep: bool,
    /// Plethysmograph waveform value, 0..=127.
    pub pleth: u8,
    /// Bargraph level, 0..=15.
    pub bargraph: u8,
    /// No finger in the probe.
    pub no_finger: bool,
    /// Device is searching for a pulse.
    pub pulse_research: bool,
    /// Pulse rate in beats per minute, 0..=255.
    pub pulse_rate: u8,
    /// Blood-oxygen saturation in percent, 0..=127.
    pub spo2: u8,
    /// Decode time.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Sample {
        Sample {
            signal_strength: 6,
            has_signal: true,
            probe_unplugged: false,
            pulse_beep: false,
            pleth: 44,
            bargraph: 5,
            no_finger: false,
            pulse_research: false,
            pulse_rate: 72,
            spo2: 98,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_serialize_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["pulse_rate"], 72);
        assert_eq!(json["spo2"], 98);
        assert_eq!(json["has_signal"], true);
        assert_eq!(json["timestamp"], "2024-03-01T12:00:00Z");
    }
}
