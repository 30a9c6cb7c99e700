//! Protocol module - packet schema, stream splitting, and packet types.
//!
//! This module implements the wire side of the oximeter link:
//! - Declarative 5-byte bit layout and the sync-bit marker predicate
//! - Lazy marker-delimited splitting of a single delivery
//! - Frame buffer for carrying a partial packet across deliveries
//! - Packet type with a field encoder

mod frame_buffer;
mod packet;
mod schema;
mod splitter;

pub use frame_buffer::{FrameBuffer, MAX_OPEN_GROUP};
pub use packet::{build_stream, Packet};
pub use schema::{
    is_frame_start, sync_mask, BitOrder, ByteLayout, Field, FieldSet, FieldSpec, FRAME_LEN,
    PACKET_SCHEMA,
};
pub use splitter::{chunks, frame_candidates, split_on_mask, Chunks};
