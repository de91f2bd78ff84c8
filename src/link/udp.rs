//! UDP link implementation.
//!
//! Emulates a broadcast link on an IP network: one datagram per frame,
//! broadcast to a configured address, unicast to admitted peers only.
//! Link addresses are the 6-byte encoding of the peer's IPv4 socket
//! address (see [`LinkAddress::to_socket_addr`]).

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::error::{Error, Result};
use crate::link::Link;
use crate::types::LinkAddress;

/// Default UDP port for sensor grid traffic.
pub const DEFAULT_PORT: u16 = 4210;

/// Receive buffer size; larger than any valid frame so oversized datagrams
/// are detected rather than silently truncated.
const RECV_BUFFER_SIZE: usize = 2048;

/// Configuration for the UDP link.
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Local address to bind.
    pub bind: SocketAddrV4,
    /// Destination of broadcast frames.
    pub broadcast: SocketAddrV4,
}

impl UdpConfig {
    /// Creates a configuration broadcasting to `255.255.255.255` on the
    /// bound port.
    #[must_use]
    pub const fn new(bind: SocketAddrV4) -> Self {
        Self {
            bind,
            broadcast: SocketAddrV4::new(Ipv4Addr::BROADCAST, bind.port()),
        }
    }

    /// Sets the broadcast destination.
    #[must_use]
    pub const fn broadcast(mut self, addr: SocketAddrV4) -> Self {
        self.broadcast = addr;
        self
    }
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self::new(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
    }
}

/// Sending half of the UDP link.
pub struct UdpLink {
    socket: Arc<UdpSocket>,
    broadcast: SocketAddrV4,
    peers: HashSet<LinkAddress>,
}

impl UdpLink {
    /// Binds the socket and returns the sending and receiving halves.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or configured.
    pub async fn bind(config: &UdpConfig) -> Result<(Self, UdpReceiver)> {
        tracing::info!("binding UDP link on {}", config.bind);

        let socket = UdpSocket::bind(config.bind).await?;
        socket.set_broadcast(true)?;
        let socket = Arc::new(socket);

        let link = Self {
            socket: Arc::clone(&socket),
            broadcast: config.broadcast,
            peers: HashSet::new(),
        };
        Ok((link, UdpReceiver { socket }))
    }

    /// Returns the bound local address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    fn transmit(&self, dest: SocketAddrV4, frame: &[u8]) -> Result<()> {
        if frame.len() > self.mtu() {
            return Err(Error::FrameTooLarge {
                size: frame.len(),
                max: self.mtu(),
            });
        }
        tracing::trace!("sending {} bytes to {}", frame.len(), dest);
        self.socket.try_send_to(frame, SocketAddr::V4(dest))?;
        Ok(())
    }
}

impl Link for UdpLink {
    fn broadcast(&mut self, frame: &[u8]) -> Result<()> {
        self.transmit(self.broadcast, frame)
    }

    fn send_to(&mut self, dest: &LinkAddress, frame: &[u8]) -> Result<()> {
        if !self.peers.contains(dest) {
            return Err(Error::PeerNotAdmitted {
                address: dest.clone(),
            });
        }
        let addr = dest
            .to_socket_addr()
            .ok_or_else(|| Error::UnsupportedAddress {
                address: dest.clone(),
            })?;
        self.transmit(addr, frame)
    }

    fn admit_peer(&mut self, addr: &LinkAddress) -> Result<()> {
        if addr.to_socket_addr().is_none() {
            return Err(Error::UnsupportedAddress {
                address: addr.clone(),
            });
        }
        if self.peers.insert(addr.clone()) {
            tracing::debug!("admitted peer {}", addr);
        }
        Ok(())
    }

    fn withdraw_peer(&mut self, addr: &LinkAddress) -> Result<()> {
        if self.peers.remove(addr) {
            tracing::debug!("withdrew peer {}", addr);
        }
        Ok(())
    }
}

/// Receiving half of the UDP link.
pub struct UdpReceiver {
    socket: Arc<UdpSocket>,
}

impl UdpReceiver {
    /// Runs the receive loop, handing every frame to `handler`.
    ///
    /// This should be spawned as a separate task. Datagrams from IPv6
    /// sources or larger than the link MTU are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket fails.
    pub async fn run<F>(self, mut handler: F) -> Result<()>
    where
        F: FnMut(&LinkAddress, &[u8]) + Send,
    {
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            let (n, source) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::error!("UDP receive error: {}", e);
                    return Err(Error::Io(e));
                }
            };

            let SocketAddr::V4(source) = source else {
                tracing::debug!("ignoring datagram from {}", source);
                continue;
            };
            if n > crate::protocol::LINK_MTU {
                tracing::debug!("dropping oversized datagram ({} bytes) from {}", n, source);
                continue;
            }

            tracing::trace!("received {} bytes from {}", n, source);
            handler(&LinkAddress::from(source), &buf[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_config_defaults() {
        let config = UdpConfig::default();
        assert_eq!(config.bind.port(), DEFAULT_PORT);
        assert_eq!(
            config.broadcast,
            SocketAddrV4::new(Ipv4Addr::BROADCAST, DEFAULT_PORT)
        );
    }

    #[test]
    fn test_udp_config_builder() {
        let target = SocketAddrV4::new(Ipv4Addr::new(192, 168, 4, 255), 5000);
        let config = UdpConfig::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).broadcast(target);
        assert_eq!(config.broadcast, target);
    }

    #[tokio::test]
    async fn test_unicast_between_sockets() {
        let loopback = UdpConfig::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
        let (mut a, _a_rx) = UdpLink::bind(&loopback).await.unwrap();
        let (b, b_rx) = UdpLink::bind(&loopback).await.unwrap();

        let SocketAddr::V4(b_addr) = b.local_addr().unwrap() else {
            panic!("expected IPv4");
        };
        let b_link = LinkAddress::from(b_addr);

        assert!(matches!(
            a.send_to(&b_link, &[0x03, 1]),
            Err(Error::PeerNotAdmitted { .. })
        ));
        a.admit_peer(&b_link).unwrap();
        a.send_to(&b_link, &[0x03, 1]).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(b_rx.run(move |source, frame| {
            let _ = tx.send((source.clone(), frame.to_vec()));
        }));

        let (_, frame) = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame, vec![0x03, 1]);
        task.abort();
    }

    #[tokio::test]
    async fn test_admit_rejects_non_udp_address() {
        let loopback = UdpConfig::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
        let (mut link, _rx) = UdpLink::bind(&loopback).await.unwrap();
        let addr = LinkAddress::from_bytes(&[1, 2, 3]);
        assert!(matches!(
            link.admit_peer(&addr),
            Err(Error::UnsupportedAddress { .. })
        ));
    }
}
