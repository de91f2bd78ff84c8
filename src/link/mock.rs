//! In-memory link for tests.
//!
//! Records every frame instead of transmitting it and enforces peer
//! admission the way a real link does.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::link::Link;
use crate::types::LinkAddress;

/// Where a recorded frame was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Broadcast to every listener.
    Broadcast,
    /// Unicast to one peer.
    Unicast(LinkAddress),
}

/// A frame recorded by [`MockLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    /// Destination of the frame.
    pub dest: Destination,
    /// Encoded frame.
    pub frame: Bytes,
}

/// Mock link for unit testing. Clones share state.
#[derive(Clone, Default)]
pub struct MockLink {
    inner: Arc<Mutex<MockLinkInner>>,
}

#[derive(Default)]
struct MockLinkInner {
    sent: Vec<SentFrame>,
    peers: HashSet<LinkAddress>,
    fail_sends: bool,
}

impl MockLink {
    /// Creates a new mock link.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockLinkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns all recorded frames.
    #[must_use]
    pub fn sent(&self) -> Vec<SentFrame> {
        self.lock().sent.clone()
    }

    /// Returns and clears the recorded frames.
    #[must_use]
    pub fn take_sent(&self) -> Vec<SentFrame> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Returns true if `addr` is currently admitted.
    #[must_use]
    pub fn is_admitted(&self, addr: &LinkAddress) -> bool {
        self.lock().peers.contains(addr)
    }

    /// Makes every subsequent send fail with an I/O error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    fn record(&self, dest: Destination, frame: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_sends {
            return Err(Error::Io(std::io::Error::other("mock send failure")));
        }
        inner.sent.push(SentFrame {
            dest,
            frame: Bytes::copy_from_slice(frame),
        });
        Ok(())
    }
}

impl Link for MockLink {
    fn broadcast(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() > self.mtu() {
            return Err(Error::FrameTooLarge {
                size: frame.len(),
                max: self.mtu(),
            });
        }
        self.record(Destination::Broadcast, frame)
    }

    fn send_to(&mut self, dest: &LinkAddress, frame: &[u8]) -> Result<()> {
        if frame.len() > self.mtu() {
            return Err(Error::FrameTooLarge {
                size: frame.len(),
                max: self.mtu(),
            });
        }
        if !self.is_admitted(dest) {
            return Err(Error::PeerNotAdmitted {
                address: dest.clone(),
            });
        }
        self.record(Destination::Unicast(dest.clone()), frame)
    }

    fn admit_peer(&mut self, addr: &LinkAddress) -> Result<()> {
        self.lock().peers.insert(addr.clone());
        Ok(())
    }

    fn withdraw_peer(&mut self, addr: &LinkAddress) -> Result<()> {
        self.lock().peers.remove(addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicast_requires_admission() {
        let mut link = MockLink::new();
        let peer = LinkAddress::from_bytes(&[1, 2, 3, 4, 5, 6]);

        assert!(matches!(
            link.send_to(&peer, &[0x03, 1]),
            Err(Error::PeerNotAdmitted { .. })
        ));

        link.admit_peer(&peer).unwrap();
        link.send_to(&peer, &[0x03, 1]).unwrap();
        assert_eq!(
            link.sent(),
            vec![SentFrame {
                dest: Destination::Unicast(peer.clone()),
                frame: Bytes::from_static(&[0x03, 1]),
            }]
        );

        link.withdraw_peer(&peer).unwrap();
        assert!(!link.is_admitted(&peer));
    }

    #[test]
    fn test_clones_share_state() {
        let mut link = MockLink::new();
        let observer = link.clone();
        link.broadcast(&[0x01]).unwrap();
        assert_eq!(observer.take_sent().len(), 1);
        assert!(observer.sent().is_empty());
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let mut link = MockLink::new();
        let frame = vec![0u8; 251];
        assert!(matches!(
            link.broadcast(&frame),
            Err(Error::FrameTooLarge { size: 251, max: 250 })
        ));
    }

    #[test]
    fn test_fail_sends() {
        let mut link = MockLink::new();
        link.set_fail_sends(true);
        assert!(matches!(link.broadcast(&[0x01]), Err(Error::Io(_))));
    }
}
