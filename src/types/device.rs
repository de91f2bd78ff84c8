//! Device record types.

use std::time::Instant;

use crate::types::address::LinkAddress;
use crate::types::sample::Measurements;

/// Coordinator-side state of one sensor identity.
///
/// Fields are only mutated through [`DeviceRegistry`](crate::registry::DeviceRegistry),
/// which keeps `link_peer_admitted ⇒ registered` and `seen ⇒ registered`.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub(crate) id: u8,
    pub(crate) link_address: Option<LinkAddress>,
    pub(crate) registered: bool,
    pub(crate) link_peer_admitted: bool,
    pub(crate) seen: bool,
    pub(crate) measurements: Measurements,
    pub(crate) last_seen_at: Option<Instant>,
}

impl DeviceRecord {
    /// Creates an unregistered, unseen record.
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            link_address: None,
            registered: false,
            link_peer_admitted: false,
            seen: false,
            measurements: Measurements::default(),
            last_seen_at: None,
        }
    }

    /// Device identity.
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Address learned from the most recent registration.
    #[must_use]
    pub const fn link_address(&self) -> Option<&LinkAddress> {
        self.link_address.as_ref()
    }

    /// True once a registration has been accepted and not evicted since.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.registered
    }

    /// True once the link accepts unicast to this device.
    #[must_use]
    pub const fn is_peer_admitted(&self) -> bool {
        self.link_peer_admitted
    }

    /// True once a complete sample has been received since registration.
    #[must_use]
    pub const fn is_seen(&self) -> bool {
        self.seen
    }

    /// Most recently received sample.
    #[must_use]
    pub const fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    /// When the most recent sample completed.
    #[must_use]
    pub const fn last_seen_at(&self) -> Option<Instant> {
        self.last_seen_at
    }
}
