//! Transport module - where deliveries come from.
//!
//! Device discovery, connection and notification subscription belong to the
//! driver program. The core only needs something that yields raw buffers:
//! - [`SampleSource`] - the read capability
//! - [`ReaderSource`] - any `AsyncRead` (serial bridge, socket, capture file)
//! - [`ChannelSource`] - notification callbacks pushing into a channel
//! - [`gatt`] - identifiers of the device's GATT service

pub mod gatt;
mod source;

pub use source::{
    BoxFuture, ChannelSource, NotificationSender, ReaderSource, SampleSource,
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_READ_SIZE,
};
