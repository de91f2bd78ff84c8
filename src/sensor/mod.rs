//! Sensor side of the protocol.
//!
//! A [`SensorNode`] answers `Discover` with `Register` and answers a `Poll`
//! for its own id with the current ready sample, fragmented to fit the
//! link. Sampling runs independently through a [`Sampler`] writing into the
//! node's [`SampleBuffer`].

pub mod sampler;

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::link::Link;
use crate::protocol::{MAX_FRAGMENT_PAYLOAD, Message, decode, encode, split_sample};
use crate::types::LinkAddress;

pub use sampler::{CounterSource, MeasurementSource, SampleBuffer, Sampler};

/// Default sampling period.
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(100);

/// Configuration for a sensor node.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Identity of this device, assigned out of band.
    pub device_id: u8,
    /// Time between samples.
    pub sample_period: Duration,
    /// Largest payload per `Data` fragment.
    pub max_fragment_payload: usize,
}

impl SensorConfig {
    /// Creates a configuration with default timing.
    #[must_use]
    pub const fn new(device_id: u8) -> Self {
        Self {
            device_id,
            sample_period: DEFAULT_SAMPLE_PERIOD,
            max_fragment_payload: MAX_FRAGMENT_PAYLOAD,
        }
    }

    /// Sets the sampling period.
    #[must_use]
    pub const fn sample_period(mut self, period: Duration) -> Self {
        self.sample_period = period;
        self
    }

    /// Sets the fragment payload limit.
    #[must_use]
    pub const fn max_fragment_payload(mut self, limit: usize) -> Self {
        self.max_fragment_payload = limit;
        self
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for device id 0 or a payload limit
    /// outside `1..=MAX_FRAGMENT_PAYLOAD`.
    pub fn validate(&self) -> Result<()> {
        if self.device_id == 0 {
            return Err(Error::InvalidConfig {
                reason: "device_id must be at least 1".into(),
            });
        }
        if !(1..=MAX_FRAGMENT_PAYLOAD).contains(&self.max_fragment_payload) {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "max_fragment_payload must be within 1..={MAX_FRAGMENT_PAYLOAD}, got {}",
                    self.max_fragment_payload
                ),
            });
        }
        Ok(())
    }
}

/// Device-side responder.
pub struct SensorNode<L> {
    config: SensorConfig,
    link: L,
    buffer: Arc<SampleBuffer>,
    coordinator: Option<LinkAddress>,
}

impl<L: Link> SensorNode<L> {
    /// Creates a node sending on `link`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration is inconsistent.
    pub fn new(config: SensorConfig, link: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            link,
            buffer: Arc::new(SampleBuffer::new()),
            coordinator: None,
        })
    }

    /// This node's device id.
    #[must_use]
    pub const fn device_id(&self) -> u8 {
        self.config.device_id
    }

    /// Address of the coordinator admitted as a peer, once known.
    #[must_use]
    pub const fn coordinator(&self) -> Option<&LinkAddress> {
        self.coordinator.as_ref()
    }

    /// The double buffer the transmit path reads from.
    #[must_use]
    pub fn buffer(&self) -> Arc<SampleBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Creates a sampler that feeds this node from `source`.
    #[must_use]
    pub fn sampler(&self, source: impl MeasurementSource + 'static) -> Sampler {
        Sampler::new(source, self.buffer(), self.config.sample_period)
    }

    /// Handles one received frame.
    pub fn on_receive(&mut self, source: &LinkAddress, frame: &[u8]) {
        let message = match decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("dropping frame from {}: {}", source, e);
                return;
            }
        };

        match message {
            Message::Discover => {
                tracing::debug!("DISCOVER from {}", source);
                self.ensure_peer(source);
                let register = encode(&Message::Register {
                    device_id: self.config.device_id,
                });
                if let Err(e) = self.link.send_to(source, &register) {
                    tracing::warn!("send failed: REGISTER to {}: {}", source, e);
                }
            }
            Message::Poll { device_id } if device_id == self.config.device_id => {
                tracing::debug!("POLL from {}", source);
                self.ensure_peer(source);
                self.send_sample(source);
            }
            Message::Poll { .. } | Message::Register { .. } | Message::Data(_) => {
                tracing::trace!("ignoring {:?} from {}", message.kind(), source);
            }
        }
    }

    fn ensure_peer(&mut self, addr: &LinkAddress) {
        if self.coordinator.as_ref() == Some(addr) {
            return;
        }
        match self.link.admit_peer(addr) {
            Ok(()) => {
                tracing::info!("coordinator at {}", addr);
                self.coordinator = Some(addr.clone());
            }
            Err(e) => tracing::warn!("failed to admit coordinator {}: {}", addr, e),
        }
    }

    fn send_sample(&mut self, dest: &LinkAddress) {
        let sample = self.buffer.snapshot().to_le_bytes();
        let fragments = match split_sample(
            self.config.device_id,
            &sample,
            self.config.max_fragment_payload,
        ) {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::error!("cannot fragment sample: {}", e);
                return;
            }
        };

        tracing::debug!(
            "sending {} bytes in {} fragments",
            sample.len(),
            fragments.len()
        );
        for fragment in fragments {
            let index = fragment.fragment_index;
            if let Err(e) = self.link.send_to(dest, &encode(&Message::Data(fragment))) {
                tracing::warn!("send failed: DATA fragment {} to {}: {}", index, dest, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MockLink;
    use crate::link::mock::Destination;
    use crate::protocol::{MEASUREMENT_COUNT, Reassembler};
    use crate::types::Measurements;

    fn coordinator() -> LinkAddress {
        LinkAddress::from_bytes(&[0x24, 0x6F, 0x28, 0xFF, 0x00, 0x01])
    }

    fn node(config: SensorConfig) -> (SensorNode<MockLink>, MockLink) {
        let link = MockLink::new();
        (SensorNode::new(config, link.clone()).unwrap(), link)
    }

    fn decoded(link: &MockLink) -> Vec<Message> {
        link.take_sent()
            .into_iter()
            .map(|sent| {
                assert_eq!(sent.dest, Destination::Unicast(coordinator()));
                decode(&sent.frame).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(SensorConfig::new(1).validate().is_ok());
        assert!(SensorConfig::new(0).validate().is_err());
        assert!(
            SensorConfig::new(1)
                .max_fragment_payload(0)
                .validate()
                .is_err()
        );
        assert!(
            SensorConfig::new(1)
                .max_fragment_payload(MAX_FRAGMENT_PAYLOAD + 1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_discover_answers_register() {
        let (mut node, link) = node(SensorConfig::new(3));
        node.on_receive(&coordinator(), &encode(&Message::Discover));

        assert_eq!(decoded(&link), vec![Message::Register { device_id: 3 }]);
        assert!(link.is_admitted(&coordinator()));
        assert_eq!(node.coordinator(), Some(&coordinator()));

        node.on_receive(&coordinator(), &encode(&Message::Discover));
        assert_eq!(decoded(&link), vec![Message::Register { device_id: 3 }]);
    }

    #[test]
    fn test_poll_for_other_device_ignored() {
        let (mut node, link) = node(SensorConfig::new(3));
        node.on_receive(&coordinator(), &encode(&Message::Poll { device_id: 4 }));
        assert!(link.sent().is_empty());
        assert!(node.coordinator().is_none());
    }

    #[test]
    fn test_poll_sends_ready_sample() {
        let (mut node, link) = node(SensorConfig::new(2));
        let mut sampler = node.sampler(CounterSource::new(2));
        sampler.update(std::time::Instant::now());

        node.on_receive(&coordinator(), &encode(&Message::Poll { device_id: 2 }));

        let messages = decoded(&link);
        assert_eq!(messages.len(), 1);
        let Message::Data(fragment) = &messages[0] else {
            panic!("expected data");
        };
        assert_eq!(fragment.device_id, 2);
        assert_eq!((fragment.fragment_index, fragment.total_fragments), (0, 1));

        let measurements = Measurements::from_le_bytes(&fragment.payload);
        assert_eq!(measurements.len(), MEASUREMENT_COUNT);
        assert_eq!(measurements.first(), Some(20));
    }

    #[test]
    fn test_poll_fragments_to_limit() {
        let (mut node, link) = node(SensorConfig::new(1).max_fragment_payload(30));
        node.buffer().write_with(|r| {
            for (i, v) in (0u16..).zip(r.iter_mut()) {
                *v = i;
            }
        });

        node.on_receive(&coordinator(), &encode(&Message::Poll { device_id: 1 }));

        let mut reassembler = Reassembler::new();
        let mut complete = None;
        let messages = decoded(&link);
        assert_eq!(messages.len(), 4);
        for message in messages {
            let Message::Data(fragment) = message else {
                panic!("expected data");
            };
            assert_eq!(fragment.total_fragments, 4);
            assert!(fragment.payload.len() <= 30);
            complete = reassembler.push(&fragment);
        }

        let sample = complete.unwrap();
        let measurements = Measurements::from_le_bytes(&sample.payload);
        assert_eq!(measurements.as_slice()[49], 49);
    }

    #[test]
    fn test_send_failure_is_logged_only() {
        let (mut node, link) = node(SensorConfig::new(1));
        link.set_fail_sends(true);
        node.on_receive(&coordinator(), &encode(&Message::Poll { device_id: 1 }));
        assert!(link.sent().is_empty());
        assert!(link.is_admitted(&coordinator()));
    }
}
