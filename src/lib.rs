//! # sensorgrid
//!
//! Coordinator-side protocol engine for a star-topology wireless sensor grid.
//!
//! One coordinator discovers an a-priori-unknown set of sensors over a
//! connectionless, broadcast-capable link with a small frame size, registers
//! them, polls each in turn for a sample too large for one frame, reassembles
//! the fragments, and evicts sensors that stop answering. Evicted sensors can
//! register again at any time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::net::{Ipv4Addr, SocketAddrV4};
//!
//! use sensorgrid::{Collector, CoordinatorConfig, UdpConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sensorgrid::Error> {
//!     let udp = UdpConfig::new(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 4210));
//!     let collector = Collector::udp(&udp, CoordinatorConfig::new(2)).await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     for sensor in collector.summary().await {
//!         println!("sensor {}: seen={} value={}", sensor.id, sensor.seen, sensor.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Wire messages, fragmentation and reassembly
//! - [`types`] - Link addresses, measurements, device records and views
//! - [`registry`] - Device table and registered-id list
//! - [`event`] - Receive callback and the event queue it publishes on
//! - [`coordinator`] - The discover/poll/evict state machine
//! - [`sensor`] - Device-side sampling and responder
//! - [`link`] - Link abstraction with UDP and mock implementations
//! - [`collector`] - Async driver running a coordinator in the background

pub mod collector;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod link;
pub mod protocol;
pub mod registry;
pub mod sensor;
pub mod types;

// Re-exports for convenience
pub use collector::Collector;
pub use coordinator::{Coordinator, CoordinatorConfig, Indicator, LogIndicator, State};
pub use error::{Error, Result, WireError};
pub use event::{RxEvent, RxEvents, RxHandler};
pub use link::{Link, MockLink, UdpConfig, UdpLink, UdpReceiver};
pub use protocol::{DataFragment, Message, MessageType, Reassembled, Reassembler};
pub use registry::{DeviceRegistry, Registration};
pub use sensor::{CounterSource, MeasurementSource, SampleBuffer, Sampler, SensorConfig, SensorNode};
pub use types::{DeviceRecord, DeviceView, LinkAddress, Measurements, SensorSummary};
