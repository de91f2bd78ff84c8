//! Protocol definitions for sensor grid communication.
//!
//! This module contains the low-level protocol types including:
//! - Message type discriminator
//! - Message encoding/decoding
//! - Sample fragmentation
//! - Coordinator-side reassembly
//!
//! Every message is one link frame. Layouts are tightly packed, byte-sized
//! fields only:
//! ```text
//! Discover  [0x01]
//! Register  [0x02] [device_id]
//! Poll      [0x03] [device_id]
//! Data      [0x04] [device_id] [fragment_index] [total_fragments] [payload_len] [payload...]
//! ```

pub mod fragment;
pub mod message;
pub mod reassembly;
pub mod wire;

pub use fragment::split_sample;
pub use message::MessageType;
pub use reassembly::{Reassembled, Reassembler};
pub use wire::{DataFragment, Message, decode, encode};

/// Frame-size ceiling of the link.
pub const LINK_MTU: usize = 250;

/// Fixed header of a `Data` message (tag, id, index, total, length).
pub const DATA_HEADER_LEN: usize = 5;

/// Largest payload a single `Data` message may carry.
pub const MAX_FRAGMENT_PAYLOAD: usize = LINK_MTU - DATA_HEADER_LEN;

/// Number of readings in one sample.
pub const MEASUREMENT_COUNT: usize = 50;

/// Encoded size of one reading (little-endian `u16`).
pub const MEASUREMENT_SIZE: usize = 2;

/// Capacity of the coordinator's reassembly scratch buffer.
pub const MAX_REASSEMBLY_SIZE: usize = 500;

/// Highest device id a coordinator tracks by default. Ids start at 1.
pub const MAX_DEVICES: u8 = 8;
