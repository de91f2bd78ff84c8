//! Coordinator-side device table.
//!
//! Holds one [`DeviceRecord`] per id in `1..=max_device_id` plus the ordered,
//! duplicate-free list of registered ids that drives round-robin polling.
//! Every id in that list has `registered == true`; the two are only ever
//! changed together.

use std::time::Instant;

use crate::types::{DeviceRecord, DeviceView, LinkAddress, Measurements, SensorSummary};

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Newly registered and appended to the polling list.
    Accepted,
    /// Already registered; nothing changed.
    Duplicate,
    /// Id outside `1..=max_device_id`.
    OutOfRange,
}

/// Device table plus registered-id list.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    records: Vec<DeviceRecord>,
    registered: Vec<u8>,
}

impl DeviceRegistry {
    /// Creates a registry for ids `1..=max_device_id`.
    #[must_use]
    pub fn new(max_device_id: u8) -> Self {
        Self {
            records: (1..=max_device_id).map(DeviceRecord::new).collect(),
            registered: Vec::with_capacity(usize::from(max_device_id)),
        }
    }

    /// Highest tracked id.
    #[must_use]
    pub fn max_device_id(&self) -> u8 {
        self.records.len() as u8
    }

    /// Returns true if `id` is within the tracked range.
    #[must_use]
    pub fn in_range(&self, id: u8) -> bool {
        id >= 1 && id <= self.max_device_id()
    }

    /// Looks up a record.
    #[must_use]
    pub fn get(&self, id: u8) -> Option<&DeviceRecord> {
        if self.in_range(id) {
            self.records.get(usize::from(id) - 1)
        } else {
            None
        }
    }

    fn get_mut(&mut self, id: u8) -> Option<&mut DeviceRecord> {
        if self.in_range(id) {
            self.records.get_mut(usize::from(id) - 1)
        } else {
            None
        }
    }

    /// Registered ids in polling order.
    #[must_use]
    pub fn registered_ids(&self) -> &[u8] {
        &self.registered
    }

    /// Number of registered devices.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    /// Returns true if `id` is currently registered.
    #[must_use]
    pub fn is_registered(&self, id: u8) -> bool {
        self.get(id).is_some_and(DeviceRecord::is_registered)
    }

    /// Returns true if fewer than `expected` devices are registered.
    #[must_use]
    pub fn any_missing(&self, expected: usize) -> bool {
        self.registered.len() < expected
            || self.registered.iter().any(|&id| !self.is_registered(id))
    }

    /// Accepts a registration from `id` at `address`.
    ///
    /// Registering an id that is already registered is a no-op.
    pub fn register(&mut self, id: u8, address: LinkAddress) -> Registration {
        let Some(record) = self.get_mut(id) else {
            return Registration::OutOfRange;
        };
        if record.registered {
            return Registration::Duplicate;
        }

        record.registered = true;
        record.link_address = Some(address);
        record.link_peer_admitted = false;
        self.registered.push(id);
        Registration::Accepted
    }

    /// Records that the link now accepts unicast to `id`.
    pub fn mark_peer_admitted(&mut self, id: u8) {
        if let Some(record) = self.get_mut(id) {
            if record.registered {
                record.link_peer_admitted = true;
            }
        }
    }

    /// Stores a completed sample for a registered device.
    ///
    /// Returns false if `id` is not registered.
    pub fn record_sample(&mut self, id: u8, measurements: Measurements, now: Instant) -> bool {
        match self.get_mut(id) {
            Some(record) if record.registered => {
                record.measurements = measurements;
                record.seen = true;
                record.last_seen_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Evicts `id`: clears its registration, admission and seen flags and
    /// removes it from the polling list, preserving the order of the rest.
    ///
    /// Returns the device's address if it had been admitted as a peer.
    pub fn evict(&mut self, id: u8) -> Option<LinkAddress> {
        self.registered.retain(|&other| other != id);

        let record = self.get_mut(id)?;
        let was_admitted = record.link_peer_admitted;
        record.registered = false;
        record.link_peer_admitted = false;
        record.seen = false;

        if was_admitted {
            record.link_address.clone()
        } else {
            None
        }
    }

    /// Measurement view of one device, `None` if `id` is out of range.
    #[must_use]
    pub fn device_view(&self, id: u8, now: Instant) -> Option<DeviceView> {
        self.get(id).map(|record| DeviceView::new(record, now))
    }

    /// Summary rows for every id in range, registered or not.
    #[must_use]
    pub fn summary(&self, now: Instant) -> Vec<SensorSummary> {
        self.records
            .iter()
            .map(|record| SensorSummary::new(record, now))
            .collect()
    }
}
