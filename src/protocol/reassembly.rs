//! Coordinator-side fragment reassembly.
//!
//! One reassembly is in progress at a time. A fragment with index 0 from
//! any device restarts it, abandoning whatever was being collected before.
//! Only fragments from the owning device whose index equals the number of
//! fragments received so far are accepted; anything else is ignored and the
//! incomplete sample is never delivered.

use bytes::{Bytes, BytesMut};

use crate::protocol::{DataFragment, MAX_REASSEMBLY_SIZE};

/// A fully reassembled sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    /// Device that sent every fragment.
    pub device_id: u8,
    /// Concatenated fragment payloads.
    pub payload: Bytes,
}

/// Accumulates sequenced fragments into a fixed-capacity buffer.
#[derive(Debug)]
pub struct Reassembler {
    device_id: u8,
    expected_fragments: u8,
    fragments_received: u8,
    buffer: BytesMut,
    capacity: usize,
    active: bool,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Creates a reassembler with `MAX_REASSEMBLY_SIZE` bytes of capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_REASSEMBLY_SIZE)
    }

    /// Creates a reassembler with a custom byte capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            device_id: 0,
            expected_fragments: 0,
            fragments_received: 0,
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            active: false,
        }
    }

    /// Feeds one fragment. Returns the sample once its last fragment arrives.
    ///
    /// A fragment whose payload would overflow the capacity still counts
    /// toward completion, but its bytes are not stored.
    pub fn push(&mut self, fragment: &DataFragment) -> Option<Reassembled> {
        if fragment.fragment_index == 0 {
            if self.active && self.fragments_received > 0 {
                tracing::debug!(
                    "abandoning reassembly for device {} at {}/{}",
                    self.device_id,
                    self.fragments_received,
                    self.expected_fragments
                );
            }
            self.device_id = fragment.device_id;
            self.expected_fragments = fragment.total_fragments;
            self.fragments_received = 0;
            self.buffer.clear();
            self.active = true;
        }

        if !self.active
            || fragment.device_id != self.device_id
            || fragment.fragment_index != self.fragments_received
        {
            tracing::trace!(
                "ignoring out-of-sequence fragment {}/{} from device {}",
                fragment.fragment_index,
                fragment.total_fragments,
                fragment.device_id
            );
            return None;
        }

        if self.buffer.len() + fragment.payload.len() <= self.capacity {
            self.buffer.extend_from_slice(&fragment.payload);
        } else {
            tracing::warn!(
                "reassembly overflow for device {}: dropping {} bytes",
                self.device_id,
                fragment.payload.len()
            );
        }
        self.fragments_received += 1;

        tracing::trace!(
            "fragment {}/{} from device {} ({} bytes)",
            self.fragments_received,
            self.expected_fragments,
            self.device_id,
            fragment.payload.len()
        );

        if self.fragments_received < self.expected_fragments {
            return None;
        }

        self.active = false;
        Some(Reassembled {
            device_id: self.device_id,
            payload: self.buffer.split().freeze(),
        })
    }

    /// Returns true while a sample is partially collected.
    #[must_use]
    pub const fn in_progress(&self) -> bool {
        self.active
    }

    /// Returns the device owning the current reassembly, if any.
    #[must_use]
    pub const fn device_id(&self) -> Option<u8> {
        if self.active { Some(self.device_id) } else { None }
    }

    /// Returns the number of bytes collected so far.
    #[must_use]
    pub fn bytes_received(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::split_sample;

    fn fragment(device_id: u8, index: u8, total: u8, payload: &'static [u8]) -> DataFragment {
        DataFragment::new(device_id, index, total, Bytes::from_static(payload)).unwrap()
    }

    #[test]
    fn test_single_fragment() {
        let mut reassembler = Reassembler::new();
        let done = reassembler.push(&fragment(1, 0, 1, &[100, 0])).unwrap();
        assert_eq!(done.device_id, 1);
        assert_eq!(&done.payload[..], &[100, 0]);
        assert!(!reassembler.in_progress());
    }

    #[test]
    fn test_in_order_sequence_rebuilds_sample() {
        let sample = Bytes::from((0..490u16).map(|i| i as u8).collect::<Vec<_>>());
        let mut reassembler = Reassembler::new();

        let fragments = split_sample(2, &sample, 245).unwrap();
        let (last, rest) = fragments.split_last().unwrap();
        for f in rest {
            assert!(reassembler.push(f).is_none());
            assert_eq!(reassembler.device_id(), Some(2));
        }
        let done = reassembler.push(last).unwrap();
        assert_eq!(done.payload, sample);
    }

    #[test]
    fn test_new_index_zero_abandons_other_device() {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&fragment(1, 0, 2, b"aa")).is_none());

        // device 2 starts; device 1 is abandoned
        assert!(reassembler.push(&fragment(2, 0, 2, b"bb")).is_none());
        assert!(reassembler.push(&fragment(1, 1, 2, b"a2")).is_none());

        let done = reassembler.push(&fragment(2, 1, 2, b"b2")).unwrap();
        assert_eq!(done.device_id, 2);
        assert_eq!(&done.payload[..], b"bbb2");
    }

    #[test]
    fn test_repeated_first_fragment_restarts() {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&fragment(1, 0, 2, b"old")).is_none());
        assert!(reassembler.push(&fragment(1, 0, 2, b"new")).is_none());
        let done = reassembler.push(&fragment(1, 1, 2, b"!")).unwrap();
        assert_eq!(&done.payload[..], b"new!");
    }

    #[test]
    fn test_gap_is_never_delivered() {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&fragment(1, 0, 3, b"a")).is_none());
        // fragment 1 lost
        assert!(reassembler.push(&fragment(1, 2, 3, b"c")).is_none());
        assert!(reassembler.in_progress());
        assert_eq!(reassembler.bytes_received(), 1);
    }

    #[test]
    fn test_fragments_without_start_are_ignored() {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&fragment(1, 1, 2, b"x")).is_none());
        assert!(!reassembler.in_progress());
        assert_eq!(reassembler.device_id(), None);
    }

    #[test]
    fn test_trailing_fragment_after_completion_is_ignored() {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&fragment(1, 0, 1, b"x")).is_some());
        assert!(reassembler.push(&fragment(1, 1, 2, b"y")).is_none());
    }

    #[test]
    fn test_overflowing_fragment_counts_but_is_dropped() {
        let mut reassembler = Reassembler::with_capacity(4);
        assert!(reassembler.push(&fragment(3, 0, 2, b"abc")).is_none());
        let done = reassembler.push(&fragment(3, 1, 2, b"de")).unwrap();
        assert_eq!(&done.payload[..], b"abc");
    }
}
