//! # berrymed-oximeter
//!
//! Stream framing and bit-field decoding for BerryMed BLE pulse oximeters.
//!
//! The device notifies an unframed byte stream in arbitrarily sized chunks.
//! Every reading is a 5-byte packet whose first byte carries a sync bit;
//! the remaining bits pack signal flags, the plethysmograph value, pulse
//! rate and SpO2.
//!
//! ## Architecture
//!
//! - **Protocol**: packet schema, marker predicate, lazy splitter
//! - **Decoder**: frame candidate → [`Sample`] or rejection
//! - **Reader**: per-delivery pass and async loop over an injected
//!   [`transport::SampleSource`], delivering to a [`sink::SampleSink`]
//!
//! ## Example
//!
//! ```
//! use berrymed_oximeter::{BitOrder, PulseReader, Sample};
//!
//! let mut reader = PulseReader::builder().bit_order(BitOrder::SyncFirst).build();
//! let mut samples: Vec<Sample> = Vec::new();
//!
//! // A stray byte, then one packet
//! let report = reader
//!     .process(&[0x11, 0x96, 0x2A, 0x05, 0x48, 0x62], &mut samples)
//!     .unwrap();
//!
//! assert_eq!(report.decoded, 1);
//! assert_eq!(report.framing_mismatches, 1);
//! assert_eq!(samples[0].pulse_rate, 72);
//! ```

pub mod codec;
pub mod error;
pub mod protocol;
pub mod sink;
pub mod transport;

mod decoder;
mod reader;
mod sample;

pub use decoder::Decoder;
pub use error::{OximeterError, RejectReason, Result};
pub use protocol::{BitOrder, Packet, FRAME_LEN};
pub use reader::{
    shutdown_channel, DeliveryReport, Framing, PulseReader, ReaderBuilder, ReaderConfig,
    ReaderStats, ShutdownHandle, ShutdownSignal, DEFAULT_POLL_INTERVAL,
};
pub use sample::Sample;
