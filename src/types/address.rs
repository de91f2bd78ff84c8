//! Link-layer addressing.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use bytes::Bytes;

/// Length of UDP-derived addresses.
pub const ADDRESS_LEN: usize = 6;

/// A variable-length link-layer address.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LinkAddress(Bytes);

impl LinkAddress {
    /// Creates an address from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }


    /// Returns the address as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the address as a hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parses an address from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(Bytes::from(hex::decode(s)?)))
    }

    /// Interprets a 6-byte address as an IPv4 socket address
    /// (4 address bytes followed by a big-endian port).
    #[must_use]
    pub fn to_socket_addr(&self) -> Option<SocketAddrV4> {
        let bytes: [u8; ADDRESS_LEN] = self.0[..].try_into().ok()?;
        let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_be_bytes([bytes[4], bytes[5]]);
        Some(SocketAddrV4::new(ip, port))
    }
}

impl From<SocketAddrV4> for LinkAddress {
    fn from(addr: SocketAddrV4) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[..4].copy_from_slice(&addr.ip().octets());
        bytes[4..].copy_from_slice(&addr.port().to_be_bytes());
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkAddress({self})")
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
