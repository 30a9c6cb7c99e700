//! Codec module - serialization of decoded samples for downstream consumers.
//!
//! - [`JsonCodec`] - one JSON object per sample, newline-delimited
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (struct-as-map)
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so sinks pick their encoding at compile time.
//!
//! # Example
//!
//! ```
//! use berrymed_oximeter::codec::{JsonCodec, MsgPackCodec};
//! use berrymed_oximeter::{BitOrder, Decoder, Sample};
//!
//! let sample = Decoder::new(BitOrder::SyncFirst)
//!     .decode(&[0x96, 0x2A, 0x05, 0x48, 0x62])
//!     .unwrap();
//!
//! let line = JsonCodec::encode_line(&sample).unwrap();
//! assert!(line.ends_with(b"\n"));
//!
//! let packed = MsgPackCodec::encode(&sample).unwrap();
//! let back: Sample = MsgPackCodec::decode(&packed).unwrap();
//! assert_eq!(back, sample);
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
