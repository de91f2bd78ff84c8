//! Measurement samples.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{MEASUREMENT_COUNT, MEASUREMENT_SIZE};

/// A fixed-capacity sample of `u16` readings.
///
/// On the wire each reading is two little-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurements {
    values: [u16; MEASUREMENT_COUNT],
    count: usize,
}

impl Default for Measurements {
    fn default() -> Self {
        Self {
            values: [0; MEASUREMENT_COUNT],
            count: 0,
        }
    }
}

impl Measurements {
    /// Creates a sample from readings, keeping at most `MEASUREMENT_COUNT`.
    #[must_use]
    pub fn from_slice(readings: &[u16]) -> Self {
        let count = readings.len().min(MEASUREMENT_COUNT);
        let mut values = [0; MEASUREMENT_COUNT];
        values[..count].copy_from_slice(&readings[..count]);
        Self { values, count }
    }

    /// Decodes a reassembled payload.
    ///
    /// A trailing odd byte is ignored and readings beyond
    /// `MEASUREMENT_COUNT` are truncated.
    #[must_use]
    pub fn from_le_bytes(payload: &[u8]) -> Self {
        let mut values = [0; MEASUREMENT_COUNT];
        let mut count = 0;
        for (slot, chunk) in values
            .iter_mut()
            .zip(payload.chunks_exact(MEASUREMENT_SIZE))
        {
            *slot = u16::from_le_bytes([chunk[0], chunk[1]]);
            count += 1;
        }
        Self { values, count }
    }

    /// Encodes the valid readings as little-endian bytes.
    #[must_use]
    pub fn to_le_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.count * MEASUREMENT_SIZE);
        for value in self.as_slice() {
            buf.put_u16_le(*value);
        }
        buf.freeze()
    }

    /// Returns the valid readings.
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        &self.values[..self.count]
    }

    /// Returns the number of valid readings.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no readings are valid.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the first reading, if any.
    #[must_use]
    pub fn first(&self) -> Option<u16> {
        self.as_slice().first().copied()
    }
}
