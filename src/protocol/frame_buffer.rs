//! Frame buffer for carrying a partial packet across deliveries.
//!
//! The splitter works on one delivery at a time, so a packet that straddles
//! two notifications ends up as two short groups and is dropped. This
//! buffer keeps the open trailing group and prepends it to the next
//! delivery instead, so the groups it yields do not depend on where the
//! transport cut the stream.
//!
//! A group is closed only by the next marker byte (or by [`FrameBuffer::flush`]),
//! exactly as the splitter closes it within one delivery. An open group that
//! grows past [`MAX_OPEN_GROUP`] bytes without a marker is released as-is to
//! bound memory on an unsynchronized link.
//!
//! # Example
//!
//! ```
//! use berrymed_oximeter::protocol::{BitOrder, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new(BitOrder::SyncFirst);
//!
//! // First notification ends in the middle of a packet
//! assert!(buffer.push(&[0x80, 0x10, 0x00]).is_empty());
//!
//! // Second notification completes it and opens the next one
//! let groups = buffer.push(&[0x48, 0x62, 0x81]);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(&groups[0][..], &[0x80, 0x10, 0x00, 0x48, 0x62]);
//! assert_eq!(buffer.len(), 1);
//! ```

use bytes::{Bytes, BytesMut};

use super::schema::{sync_mask, BitOrder};

/// Default buffer capacity (a few dozen packets).
const DEFAULT_CAPACITY: usize = 256;

/// Longest open group held while waiting for a marker.
pub const MAX_OPEN_GROUP: usize = 4096;

/// Accumulates deliveries and yields marker-delimited groups.
///
/// Uses `BytesMut` so emitted groups are zero-copy views of the buffer.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Bytes of the still-open group.
    buffer: BytesMut,
    /// Marker bit mask, computed once from the bit order.
    mask: u8,
}

impl FrameBuffer {
    /// Create a new frame buffer with default capacity.
    pub fn new(order: BitOrder) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, order)
    }

    /// Create a new frame buffer with custom initial capacity.
    pub fn with_capacity(capacity: usize, order: BitOrder) -> Self {
        Self::with_mask(capacity, sync_mask(order))
    }

    /// Create a frame buffer splitting on an explicit marker mask.
    pub fn with_mask(capacity: usize, mask: u8) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            mask,
        }
    }

    /// Append a delivery and extract every group that is known to be closed.
    ///
    /// Groups are returned in stream order. Lengths are not validated here;
    /// that is the decoder's job.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);

        let mut groups = Vec::new();
        while let Some(group) = self.try_extract_one() {
            groups.push(group);
        }
        groups
    }

    /// Split off the next closed group, if any.
    fn try_extract_one(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            return None;
        }

        let mask = self.mask;
        let boundary = self.buffer[1..]
            .iter()
            .position(|&b| b & mask != 0)
            .map(|i| i + 1);

        match boundary {
            Some(end) => Some(self.buffer.split_to(end).freeze()),
            None if self.buffer.len() > MAX_OPEN_GROUP => Some(self.buffer.split().freeze()),
            None => None,
        }
    }

    /// Take whatever is still buffered, e.g. when the transport closes.
    pub fn flush(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(BitOrder::default())
    }
}
