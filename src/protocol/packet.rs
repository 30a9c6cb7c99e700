//! Fixed-size packet with a field encoder.
//!
//! The device only ever sends packets, so encoding exists for synthesising
//! streams: replay captures, mock transports and tests.
//!
//! # Example
//!
//! ```
//! use berrymed_oximeter::protocol::{BitOrder, Packet};
//!
//! let packet = Packet::from_slice(&[0x80, 0x10, 0x00, 0x48, 0x62]).unwrap();
//! assert!(packet.is_synced(BitOrder::SyncFirst));
//! assert_eq!(packet.as_bytes().len(), 5);
//! ```

use bytes::Bytes;

use super::schema::{is_frame_start, BitOrder, Field, FieldSet, FRAME_LEN, PACKET_SCHEMA};
use crate::error::{OximeterError, Result};
use crate::sample::Sample;

/// A group of exactly [`FRAME_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet([u8; FRAME_LEN]);

impl Packet {
    /// Wrap raw bytes.
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a frame candidate, rejecting any length other than 5.
    pub fn from_slice(group: &[u8]) -> Result<Self> {
        let bytes: [u8; FRAME_LEN] = group
            .try_into()
            .map_err(|_| OximeterError::FramingMismatch { len: group.len() })?;
        Ok(Self(bytes))
    }

    /// Pack the fields of `sample` under `order`. The timestamp is not
    /// encoded; the sync bit is set on position 0 only.
    pub fn encode(sample: &Sample, order: BitOrder) -> Result<Self> {
        let mut fields = FieldSet::new();
        fields.insert(Field::SignalStrength, sample.signal_strength)?;
        fields.insert(Field::HasSignal, u8::from(sample.has_signal))?;
        fields.insert(Field::ProbeUnplugged, u8::from(sample.probe_unplugged))?;
        fields.insert(Field::PulseBeep, u8::from(sample.pulse_beep))?;
        fields.insert(Field::Pleth, sample.pleth)?;
        fields.insert(Field::Bargraph, sample.bargraph)?;
        fields.insert(Field::NoFinger, u8::from(sample.no_finger))?;
        fields.insert(Field::PulseResearch, u8::from(sample.pulse_research))?;
        fields.insert(Field::PulseRateHigh, sample.pulse_rate >> 7)?;
        fields.insert(Field::PulseRateLow, sample.pulse_rate & 0x7F)?;
        fields.insert(Field::Spo2, sample.spo2)?;

        let mut bytes = [0u8; FRAME_LEN];
        for (pos, layout) in PACKET_SCHEMA.iter().enumerate() {
            bytes[pos] = layout.pack(&fields, pos == 0, order)?;
        }
        Ok(Self(bytes))
    }

    /// Raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Copy into a `Bytes` buffer.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }

    /// Whether position 0 carries the marker bit under `order`.
    #[inline]
    pub fn is_synced(&self, order: BitOrder) -> bool {
        is_frame_start(self.0[0], order)
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Packet> for [u8; FRAME_LEN] {
    fn from(packet: Packet) -> Self {
        packet.0
    }
}

/// Concatenate packets into one delivery-sized buffer.
pub fn build_stream<'a>(packets: impl IntoIterator<Item = &'a Packet>) -> Bytes {
    let mut out = Vec::new();
    for packet in packets {
        out.extend_from_slice(packet.as_bytes());
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(pulse_rate: u8, spo2: u8) -> Sample {
        Sample {
            signal_strength: 7,
            has_signal: true,
            probe_unplugged: false,
            pulse_beep: true,
            pleth: 100,
            bargraph: 3,
            no_finger: false,
            pulse_research: true,
            pulse_rate,
            spo2,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_from_slice_length_check() {
        assert!(Packet::from_slice(&[0; 5]).is_ok());

        for len in [0usize, 1, 4, 6, 10] {
            let err = Packet::from_slice(&vec![0; len]).unwrap_err();
            assert!(matches!(err, OximeterError::FramingMismatch { len: l } if l == len));
        }
    }

    #[test]
    fn test_encode_sync_first_layout() {
        let packet = Packet::encode(&sample(129, 97), BitOrder::SyncFirst).unwrap();
        let b = packet.as_bytes();

        // sync | pulse_beep | probe_unplugged=0 | has_signal | signal_strength=0111
        assert_eq!(b[0], 0b1101_0111);
        assert_eq!(b[1], 100);
        // sync=0 | pr_high=1 | pulse_research=1 | no_finger=0 | bargraph=0011
        assert_eq!(b[2], 0b0110_0011);
        assert_eq!(b[3], 1);
        assert_eq!(b[4], 97);
        assert!(packet.is_synced(BitOrder::SyncFirst));
    }

    #[test]
    fn test_encode_sync_last_layout() {
        let packet = Packet::encode(&sample(5, 97), BitOrder::SyncLast).unwrap();
        let b = packet.as_bytes();

        // signal_strength=0111 | has_signal | probe_unplugged=0 | pulse_beep | sync
        assert_eq!(b[0], 0b0111_1011);
        assert_eq!(b[1], 100 << 1);
        assert_eq!(b[3], 5 << 1);
        assert_eq!(b[4], 97 << 1);
        assert!(packet.is_synced(BitOrder::SyncLast));
        assert!(!packet.is_synced(BitOrder::SyncFirst));
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        let mut bad = sample(60, 95);
        bad.pleth = 200;
        let err = Packet::encode(&bad, BitOrder::SyncFirst).unwrap_err();
        assert!(matches!(err, OximeterError::FieldEncode(_)));
    }

    #[test]
    fn test_build_stream() {
        let a = Packet::new([0x80, 1, 2, 3, 4]);
        let b = Packet::new([0x81, 5, 6, 7, 8]);
        let stream = build_stream([&a, &b]);
        assert_eq!(&stream[..], &[0x80, 1, 2, 3, 4, 0x81, 5, 6, 7, 8]);
    }
}
