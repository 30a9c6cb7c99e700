//! Declarative bit layout of the 5-byte oximeter packet.
//!
//! Each byte position carries its own layout, written down as an ordered
//! list of `(field, width)` pairs:
//!
//! ```text
//! pos │ declared fields (declaration order)
//! ────┼──────────────────────────────────────────────────────────────
//!  0  │ signal_strength:4  has_signal:1  probe_unplugged:1  pulse_beep:1  sync:1
//!  1  │ pleth:7            sync:1
//!  2  │ bargraph:4         no_finger:1   pulse_research:1   pr_high:1     sync:1
//!  3  │ pr_low:7           sync:1
//!  4  │ spo2:7             sync:1
//! ```
//!
//! How declaration order maps onto bits is decided by [`BitOrder`]. The same
//! order must be used for the marker predicate and for field extraction.

use serde::{Deserialize, Serialize};

use crate::error::{OximeterError, Result};

/// Packet size in bytes (fixed, exactly 5).
pub const FRAME_LEN: usize = 5;

/// Number of bits in one wire byte.
const BYTE_BITS: u8 = 8;

/// Mapping of declared field order onto the bits of a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    /// First declared field takes the least significant bits; the sync bit
    /// ends up in bit 7.
    #[default]
    SyncFirst,
    /// First declared field takes the most significant bits; the sync bit
    /// ends up in bit 0.
    SyncLast,
}

/// Named sub-byte field of the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SignalStrength,
    HasSignal,
    ProbeUnplugged,
    PulseBeep,
    Pleth,
    Bargraph,
    NoFinger,
    PulseResearch,
    /// Bit 7 of the pulse rate, carried in position 2.
    PulseRateHigh,
    /// Bits 0..=6 of the pulse rate, carried in position 3.
    PulseRateLow,
    Spo2,
    /// Framing marker; never part of a sample.
    Sync,
}

impl Field {
    /// Number of distinct fields (used to size [`FieldSet`]).
    pub const COUNT: usize = 12;

    /// Wire name of the field.
    pub const fn name(self) -> &'static str {
        match self {
            Field::SignalStrength => "signal_strength",
            Field::HasSignal => "has_signal",
            Field::ProbeUnplugged => "probe_unplugged",
            Field::PulseBeep => "pulse_beep",
            Field::Pleth => "pleth",
            Field::Bargraph => "bargraph",
            Field::NoFinger => "no_finger",
            Field::PulseResearch => "pulse_research",
            Field::PulseRateHigh => "pr_high",
            Field::PulseRateLow => "pr_low",
            Field::Spo2 => "spo2",
            Field::Sync => "sync_bit",
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

/// One entry of a byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field stored in these bits.
    pub field: Field,
    /// Width in bits (1..=8).
    pub width: u8,
}

const fn bits(field: Field, width: u8) -> FieldSpec {
    FieldSpec { field, width }
}

/// Layout of a single byte position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteLayout {
    /// Fields in declaration order.
    pub fields: &'static [FieldSpec],
}

/// Per-position layouts of the packet.
pub static PACKET_SCHEMA: [ByteLayout; FRAME_LEN] = [
    ByteLayout {
        fields: &[
            bits(Field::SignalStrength, 4),
            bits(Field::HasSignal, 1),
            bits(Field::ProbeUnplugged, 1),
            bits(Field::PulseBeep, 1),
            bits(Field::Sync, 1),
        ],
    },
    ByteLayout {
        fields: &[bits(Field::Pleth, 7), bits(Field::Sync, 1)],
    },
    ByteLayout {
        fields: &[
            bits(Field::Bargraph, 4),
            bits(Field::NoFinger, 1),
            bits(Field::PulseResearch, 1),
            bits(Field::PulseRateHigh, 1),
            bits(Field::Sync, 1),
        ],
    },
    ByteLayout {
        fields: &[bits(Field::PulseRateLow, 7), bits(Field::Sync, 1)],
    },
    ByteLayout {
        fields: &[bits(Field::Spo2, 7), bits(Field::Sync, 1)],
    },
];

impl ByteLayout {
    /// Total number of bits declared by this layout.
    pub fn width(&self) -> u32 {
        self.fields.iter().map(|f| u32::from(f.width)).sum()
    }

    /// Iterate `(spec, shift)` pairs, where `shift` is the position of the
    /// field's least significant bit under `order`.
    ///
    /// Fails if the layout does not cover exactly one byte.
    pub fn placements(
        &self,
        order: BitOrder,
    ) -> Result<impl Iterator<Item = (FieldSpec, u8)> + '_> {
        if self.width() != u32::from(BYTE_BITS) {
            return Err(OximeterError::FieldDecode(format!(
                "layout covers {} bits, expected {}",
                self.width(),
                BYTE_BITS
            )));
        }
        if let Some(spec) = self.fields.iter().find(|f| f.width == 0) {
            return Err(OximeterError::FieldDecode(format!(
                "field {} has zero width",
                spec.field.name()
            )));
        }

        let mut consumed = 0u8;
        Ok(self.fields.iter().map(move |spec| {
            let shift = match order {
                BitOrder::SyncFirst => consumed,
                BitOrder::SyncLast => BYTE_BITS - consumed - spec.width,
            };
            consumed += spec.width;
            (*spec, shift)
        }))
    }

    /// Bit mask of `field` within this byte, if the layout contains it.
    pub fn mask_of(&self, field: Field, order: BitOrder) -> Option<u8> {
        self.placements(order)
            .ok()?
            .find(|(spec, _)| spec.field == field)
            .map(|(spec, shift)| field_mask(spec.width) << shift)
    }

    /// Mask of the sync bit, or 0 if the layout carries none.
    pub fn marker_mask(&self, order: BitOrder) -> u8 {
        self.mask_of(Field::Sync, order).unwrap_or(0)
    }

    /// Extract every non-sync field of `byte` into `out`.
    pub fn parse_into(&self, byte: u8, order: BitOrder, out: &mut FieldSet) -> Result<()> {
        for (spec, shift) in self.placements(order)? {
            if spec.field == Field::Sync {
                continue;
            }
            let value = (byte >> shift) & field_mask(spec.width);
            out.insert(spec.field, value)?;
        }
        Ok(())
    }

    /// Pack field values into one byte. Fields absent from `values` are 0,
    /// except the sync bit which is driven by `sync`.
    pub fn pack(&self, values: &FieldSet, sync: bool, order: BitOrder) -> Result<u8> {
        let mut byte = 0u8;
        for (spec, shift) in self.placements(order)? {
            let value = if spec.field == Field::Sync {
                u8::from(sync)
            } else {
                values.get(spec.field).unwrap_or(0)
            };
            if value > field_mask(spec.width) {
                return Err(OximeterError::FieldEncode(format!(
                    "{} = {} does not fit in {} bits",
                    spec.field.name(),
                    value,
                    spec.width
                )));
            }
            byte |= value << shift;
        }
        Ok(byte)
    }
}

#[inline]
fn field_mask(width: u8) -> u8 {
    // width is validated to 1..=8 by `placements`
    ((1u16 << width) - 1) as u8
}

/// Decoded field values of one packet, indexed by [`Field`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSet {
    values: [Option<u8>; Field::COUNT],
}

impl FieldSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value; a field may be set only once.
    pub fn insert(&mut self, field: Field, value: u8) -> Result<()> {
        let slot = &mut self.values[field.index()];
        if slot.is_some() {
            return Err(OximeterError::FieldDecode(format!(
                "field {} decoded twice",
                field.name()
            )));
        }
        *slot = Some(value);
        Ok(())
    }

    /// Value of a field, if decoded.
    #[inline]
    pub fn get(&self, field: Field) -> Option<u8> {
        self.values[field.index()]
    }

    /// Value of a field, failing if it was never decoded.
    pub fn require(&self, field: Field) -> Result<u8> {
        self.get(field).ok_or_else(|| {
            OximeterError::FieldDecode(format!("field {} missing from packet", field.name()))
        })
    }

    /// Value of a single-bit field as a flag.
    pub fn flag(&self, field: Field) -> Result<bool> {
        Ok(self.require(field)? != 0)
    }
}

/// Whether `byte` has the sync bit of position 0 set under `order`.
///
/// Looks at the byte in isolation; payload bytes can match by accident.
///
/// # Example
///
/// ```
/// use berrymed_oximeter::protocol::{is_frame_start, BitOrder};
///
/// assert!(is_frame_start(0x80, BitOrder::SyncFirst));
/// assert!(!is_frame_start(0x7F, BitOrder::SyncFirst));
/// assert!(is_frame_start(0x01, BitOrder::SyncLast));
/// ```
#[inline]
pub fn is_frame_start(byte: u8, order: BitOrder) -> bool {
    byte & sync_mask(order) != 0
}

/// Mask of the marker bit under `order`.
///
/// Walks the position-0 layout; callers scanning many bytes compute it
/// once and test `byte & mask` themselves.
pub fn sync_mask(order: BitOrder) -> u8 {
    PACKET_SCHEMA[0].marker_mask(order)
}
