//! Link layer for sensor grid communication.
//!
//! This module provides the abstraction over the broadcast-capable,
//! unacknowledged link. Implementations deliver received frames to a
//! handler as `(source, bytes)`; sending never waits for delivery.

pub mod mock;
pub mod udp;

use crate::error::Result;
use crate::protocol::LINK_MTU;
use crate::types::LinkAddress;

/// Trait for link implementations.
///
/// Unicast requires the destination to be admitted as a peer first.
pub trait Link: Send {
    /// Sends a frame to every listener.
    fn broadcast(&mut self, frame: &[u8]) -> Result<()>;

    /// Sends a frame to one admitted peer.
    fn send_to(&mut self, dest: &LinkAddress, frame: &[u8]) -> Result<()>;

    /// Allows unicast to and from `addr`. Admitting twice is not an error.
    fn admit_peer(&mut self, addr: &LinkAddress) -> Result<()>;

    /// Withdraws a previous admission.
    fn withdraw_peer(&mut self, addr: &LinkAddress) -> Result<()>;

    /// Returns the frame-size ceiling.
    fn mtu(&self) -> usize {
        LINK_MTU
    }
}

pub use mock::MockLink;
pub use udp::{UdpConfig, UdpLink, UdpReceiver};
