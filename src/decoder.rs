//! Packet decoder.
//!
//! Turns one frame candidate into a [`Sample`] by applying
//! [`PACKET_SCHEMA`] position by position. Malformed candidates are an
//! expected outcome and come back as errors, never panics.
//!
//! # Example
//!
//! ```
//! use berrymed_oximeter::{BitOrder, Decoder};
//!
//! let decoder = Decoder::new(BitOrder::SyncFirst);
//! let sample = decoder.decode(&[0x96, 0x2A, 0x05, 0x48, 0x62]).unwrap();
//!
//! assert_eq!(sample.signal_strength, 6);
//! assert!(sample.has_signal);
//! assert_eq!(sample.pleth, 42);
//! assert_eq!(sample.pulse_rate, 72);
//! assert_eq!(sample.spo2, 98);
//!
//! assert!(decoder.decode(&[0x96, 0x2A, 0x05, 0x48]).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::{OximeterError, Result};
use crate::protocol::{BitOrder, ByteLayout, Field, FieldSet, FRAME_LEN, PACKET_SCHEMA};
use crate::sample::Sample;

/// Stateless packet decoder bound to one bit order and one layout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    schema: &'static [ByteLayout; FRAME_LEN],
    order: BitOrder,
}

impl Decoder {
    /// Create a decoder for [`PACKET_SCHEMA`] under the given bit order.
    pub fn new(order: BitOrder) -> Self {
        Self::with_schema(&PACKET_SCHEMA, order)
    }

    /// Create a decoder for a custom layout table.
    ///
    /// The table is checked frame by frame; a layout that does not cover
    /// exactly one byte rejects every frame with `FieldDecode`.
    pub fn with_schema(schema: &'static [ByteLayout; FRAME_LEN], order: BitOrder) -> Self {
        Self { schema, order }
    }

    /// Bit order used for every position.
    #[inline]
    pub fn order(&self) -> BitOrder {
        self.order
    }

    /// Layout table in use.
    #[inline]
    pub fn schema(&self) -> &'static [ByteLayout; FRAME_LEN] {
        self.schema
    }

    /// Mask of the frame-start marker: the sync bit of position 0.
    pub fn sync_mask(&self) -> u8 {
        self.schema[0].marker_mask(self.order)
    }

    /// Decode a frame candidate, stamping it with the current time.
    pub fn decode(&self, group: &[u8]) -> Result<Sample> {
        self.decode_at(group, Utc::now())
    }

    /// Decode a frame candidate with a caller-supplied timestamp.
    ///
    /// # Errors
    ///
    /// - [`OximeterError::FramingMismatch`] if `group` is not 5 bytes long
    /// - [`OximeterError::FieldDecode`] if a byte does not fit its layout
    pub fn decode_at(&self, group: &[u8], timestamp: DateTime<Utc>) -> Result<Sample> {
        if group.len() != FRAME_LEN {
            return Err(OximeterError::FramingMismatch { len: group.len() });
        }

        let mut fields = FieldSet::new();
        for (pos, (layout, &byte)) in self.schema.iter().zip(group).enumerate() {
            layout
                .parse_into(byte, self.order, &mut fields)
                .map_err(|e| match e {
                    OximeterError::FieldDecode(msg) => {
                        OximeterError::FieldDecode(format!("position {pos}: {msg}"))
                    }
                    other => other,
                })?;
        }

        Ok(Sample {
            signal_strength: fields.require(Field::SignalStrength)?,
            has_signal: fields.flag(Field::HasSignal)?,
            probe_unplugged: fields.flag(Field::ProbeUnplugged)?,
            pulse_beep: fields.flag(Field::PulseBeep)?,
            pleth: fields.require(Field::Pleth)?,
            bargraph: fields.require(Field::Bargraph)?,
            no_finger: fields.flag(Field::NoFinger)?,
            pulse_research: fields.flag(Field::PulseResearch)?,
            pulse_rate: pulse_rate(
                fields.require(Field::PulseRateHigh)?,
                fields.require(Field::PulseRateLow)?,
            )?,
            spo2: fields.require(Field::Spo2)?,
            timestamp,
        })
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(BitOrder::default())
    }
}

/// Join the carry bit from position 2 with the 7 low bits from position 3.
fn pulse_rate(high: u8, low: u8) -> Result<u8> {
    let combined = (u16::from(high) << 7) | u16::from(low);
    u8::try_from(combined).map_err(|_| {
        OximeterError::FieldDecode(format!(
            "pulse rate {combined} (high={high}, low={low}) out of range"
        ))
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::WIDE_CARRY;
    use crate::protocol::Packet;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
    }

    fn sample() -> Sample {
        Sample {
            signal_strength: 11,
            has_signal: true,
            probe_unplugged: false,
            pulse_beep: true,
            pleth: 93,
            bargraph: 12,
            no_finger: false,
            pulse_research: true,
            pulse_rate: 164,
            spo2: 96,
            timestamp: ts(),
        }
    }

    #[test]
    fn test_rejects_wrong_lengths() {
        let decoder = Decoder::default();
        for len in [0usize, 1, 4, 6, 9] {
            let group = vec![0x80; len];
            let err = decoder.decode(&group).unwrap_err();
            assert!(matches!(err, OximeterError::FramingMismatch { len: l } if l == len));
        }
    }

    #[test]
    fn test_all_zero_frame() {
        for order in [BitOrder::SyncFirst, BitOrder::SyncLast] {
            let s = Decoder::new(order).decode_at(&[0; 5], ts()).unwrap();
            assert_eq!(s.signal_strength, 0);
            assert!(!s.has_signal);
            assert!(!s.probe_unplugged);
            assert!(!s.pulse_beep);
            assert_eq!(s.pleth, 0);
            assert_eq!(s.bargraph, 0);
            assert!(!s.no_finger);
            assert!(!s.pulse_research);
            assert_eq!(s.pulse_rate, 0);
            assert_eq!(s.spo2, 0);
        }
    }

    #[test]
    fn test_field_round_trip_both_orders() {
        for order in [BitOrder::SyncFirst, BitOrder::SyncLast] {
            let packet = Packet::encode(&sample(), order).unwrap();
            let decoded = Decoder::new(order).decode_at(packet.as_ref(), ts()).unwrap();
            assert_eq!(decoded, sample(), "{order:?}");
        }
    }

    #[test]
    fn test_pulse_rate_carry_bit() {
        // SyncFirst: position 2 bit 6 is the carry, position 3 bits 0..=6 the low part
        let decoder = Decoder::new(BitOrder::SyncFirst);

        let s = decoder.decode(&[0x80, 0, 0b0100_0000, 0b000_0001, 0]).unwrap();
        assert_eq!(s.pulse_rate, 129);

        let s = decoder.decode(&[0x80, 0, 0, 5, 0]).unwrap();
        assert_eq!(s.pulse_rate, 5);

        let s = decoder.decode(&[0x80, 0, 0b0100_0000, 0x7F, 0]).unwrap();
        assert_eq!(s.pulse_rate, 255);
    }

    #[test]
    fn test_pulse_rate_carry_bit_sync_last() {
        // SyncLast: position 2 bit 1 is the carry, position 3 bits 1..=7 the low part
        let decoder = Decoder::new(BitOrder::SyncLast);

        let s = decoder.decode(&[0x01, 0, 0b0000_0010, 0b0000_0010, 0]).unwrap();
        assert_eq!(s.pulse_rate, 129);

        let s = decoder.decode(&[0x01, 0, 0, 5 << 1, 0]).unwrap();
        assert_eq!(s.pulse_rate, 5);
    }

    #[test]
    fn test_sync_bits_do_not_leak_into_values() {
        let decoder = Decoder::new(BitOrder::SyncFirst);
        let s = decoder.decode(&[0x80, 0x80, 0x80, 0x80, 0x80]).unwrap();
        assert_eq!(s.signal_strength, 0);
        assert_eq!(s.pleth, 0);
        assert_eq!(s.bargraph, 0);
        assert_eq!(s.pulse_rate, 0);
        assert_eq!(s.spo2, 0);
    }

    #[test]
    fn test_timestamp_assigned_at_decode() {
        let before = Utc::now();
        let s = Decoder::default().decode(&[0x80, 0, 0, 0, 0]).unwrap();
        assert!(s.timestamp >= before);
        assert!(s.timestamp <= Utc::now());
    }

    #[test]
    fn test_custom_schema() {
        let decoder = Decoder::with_schema(&WIDE_CARRY, BitOrder::SyncFirst);
        assert_eq!(decoder.sync_mask(), 0x80);

        let s = decoder.decode(&[0x80, 0, 0b0010_0001, 1, 0]).unwrap();
        assert_eq!(s.bargraph, 1);
        assert_eq!(s.pulse_rate, 129);

        let err = decoder.decode(&[0x80, 0, 0b0100_0000, 0, 0]).unwrap_err();
        assert!(matches!(&err, OximeterError::FieldDecode(msg) if msg.contains("out of range")));
    }

    #[test]
    fn test_pulse_rate_reconstruction_range() {
        assert_eq!(pulse_rate(1, 1).unwrap(), 129);
        assert_eq!(pulse_rate(0, 5).unwrap(), 5);
        assert!(pulse_rate(2, 0).is_err());
    }
}
