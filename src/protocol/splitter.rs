//! Marker-delimited splitting of a delivery into frame candidates.
//!
//! Groups are produced lazily as borrowed slices, so a large delivery is
//! never copied. Splitting rules:
//!
//! - bytes before the first marker form a leading group of their own;
//! - a marker opens a group when it is the first byte of that group, and
//!   closes the current group (opening the next) anywhere else;
//! - whatever is open at end of input is emitted as-is.
//!
//! Concatenating the groups always reproduces the input.
//!
//! # Example
//!
//! ```
//! use berrymed_oximeter::protocol::chunks;
//!
//! let data = [2, 1, 3, 2, 1, 3, 2, 1, 3];
//! let groups: Vec<&[u8]> = chunks(&data, |b| b == 3).collect();
//! assert_eq!(groups, vec![&[2, 1][..], &[3, 2, 1], &[3, 2, 1], &[3]]);
//! ```

use super::schema::{sync_mask, BitOrder};

/// Iterator over marker-delimited groups of a byte slice.
#[derive(Debug, Clone)]
pub struct Chunks<'a, P> {
    data: &'a [u8],
    is_frame_start: P,
}

impl<'a, P> Chunks<'a, P>
where
    P: FnMut(u8) -> bool,
{
    /// Split `data` at every byte for which `is_frame_start` holds.
    pub fn new(data: &'a [u8], is_frame_start: P) -> Self {
        Self {
            data,
            is_frame_start,
        }
    }

    /// Bytes not yet emitted.
    pub fn remainder(&self) -> &'a [u8] {
        self.data
    }
}

impl<'a, P> Iterator for Chunks<'a, P>
where
    P: FnMut(u8) -> bool,
{
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let data = self.data;
        let is_frame_start = &mut self.is_frame_start;

        // The first byte always belongs to the current group, marker or not.
        let end = data[1..]
            .iter()
            .position(|&b| is_frame_start(b))
            .map_or(data.len(), |i| i + 1);

        let (group, rest) = data.split_at(end);
        self.data = rest;
        Some(group)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.data.is_empty() {
            (0, Some(0))
        } else {
            (1, Some(self.data.len()))
        }
    }
}

impl<P> std::iter::FusedIterator for Chunks<'_, P> where P: FnMut(u8) -> bool {}

/// Split `data` into groups using an arbitrary marker predicate.
#[inline]
pub fn chunks<P>(data: &[u8], is_frame_start: P) -> Chunks<'_, P>
where
    P: FnMut(u8) -> bool,
{
    Chunks::new(data, is_frame_start)
}

/// Split `data` on the packet sync bit under `order`.
#[inline]
pub fn frame_candidates(data: &[u8], order: BitOrder) -> Chunks<'_, impl FnMut(u8) -> bool> {
    split_on_mask(data, sync_mask(order))
}

/// Split `data` at every byte with any bit of `mask` set.
#[inline]
pub fn split_on_mask(data: &[u8], mask: u8) -> Chunks<'_, impl FnMut(u8) -> bool> {
    Chunks::new(data, move |b| b & mask != 0)
}
