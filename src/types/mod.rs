//! Data types for sensor grid entities.
//!
//! This module contains the core data structures used throughout the library:
//! - Link addresses
//! - Measurement samples
//! - Device records
//! - Presentation snapshots

pub mod address;
pub mod device;
pub mod sample;
pub mod snapshot;

pub use address::LinkAddress;
pub use device::DeviceRecord;
pub use sample::Measurements;
pub use snapshot::{DeviceView, SensorSummary};
