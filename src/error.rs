//! Error types for the sensorgrid library.

use thiserror::Error;

use crate::protocol::MessageType;
use crate::types::LinkAddress;

/// The main error type for sensorgrid operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message encoding/decoding error.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Unicast attempted to an address the link has not admitted.
    #[error("peer not admitted: {address}")]
    PeerNotAdmitted { address: LinkAddress },

    /// Frame exceeds the link's size ceiling.
    #[error("frame too large: {size} bytes exceeds link MTU {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Address cannot be used on this link.
    #[error("unsupported link address: {address}")]
    UnsupportedAddress { address: LinkAddress },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Background tasks are already running.
    #[error("already started")]
    AlreadyStarted,
}

/// Wire-format errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Frame carries no bytes at all.
    #[error("empty frame")]
    Empty,

    /// Leading byte is not a known message type.
    #[error("unknown message type: 0x{0:02x}")]
    UnknownType(u8),

    /// Frame shorter than the fixed layout of its message type.
    #[error("{message:?} too short: need at least {need} bytes, got {got}")]
    TooShort {
        message: MessageType,
        need: usize,
        got: usize,
    },

    /// Declared fragment payload exceeds the protocol maximum.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Declared fragment payload runs past the end of the frame.
    #[error("truncated payload: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// Fragment index/total pair cannot describe a valid sequence.
    #[error("invalid fragment {index} of {total}")]
    InvalidFragment { index: u8, total: u8 },

    /// Sample needs more fragments than the header can count.
    #[error("sample needs {count} fragments, at most 255 allowed")]
    TooManyFragments { count: usize },

    /// Fragment payload limit outside `1..=MAX_FRAGMENT_PAYLOAD`.
    #[error("invalid fragment payload limit: {limit}")]
    InvalidPayloadLimit { limit: usize },
}

/// Result type alias for sensorgrid operations.
pub type Result<T> = std::result::Result<T, Error>;
