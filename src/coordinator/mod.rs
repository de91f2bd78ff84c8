//! Coordinator state machine.
//!
//! The coordinator discovers sensors, registers them, and polls each
//! registered sensor in turn for its current sample:
//!
//! ```text
//! DISCOVERING ──(expected count registered)──> POLLING <──> WAITING_DATA
//! ```
//!
//! [`Coordinator::tick`] advances the machine by one non-blocking step and
//! is meant to be called repeatedly by an outer loop. Every step first
//! drains the receive events published by the link callback, so
//! registrations are accepted in any state.

pub mod config;
pub mod indicator;

use std::time::Instant;

use crate::error::Result;
use crate::event::{self, RxEvent, RxEvents, RxHandler};
use crate::link::Link;
use crate::protocol::{Message, Reassembled, encode};
use crate::registry::{DeviceRegistry, Registration};
use crate::types::{DeviceView, LinkAddress, Measurements, SensorSummary};

pub use config::CoordinatorConfig;
pub use indicator::{Indicator, LogIndicator};

use indicator::Blinker;

/// Coordinator machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Broadcasting `Discover` until enough devices registered.
    Discovering,
    /// Ready to poll the next registered device.
    Polling,
    /// Poll sent; waiting for the device's sample.
    WaitingData,
}

/// Coordinator-side protocol engine.
pub struct Coordinator<L> {
    config: CoordinatorConfig,
    link: L,
    registry: DeviceRegistry,
    events: RxEvents,

    state: State,
    poll_index: usize,
    retry_count: u8,
    state_entered_at: Option<Instant>,
    last_discover_at: Option<Instant>,
    pending_sample: Option<Reassembled>,

    blinker: Blinker,
    indicator: Box<dyn Indicator>,
}

impl<L: Link> Coordinator<L> {
    /// Creates a coordinator and the receive handler to register with the
    /// link.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration is inconsistent.
    pub fn new(config: CoordinatorConfig, link: L) -> Result<(Self, RxHandler)> {
        config.validate()?;
        let (handler, events) = event::channel(config.event_capacity);

        tracing::info!(
            "coordinator expecting {} devices (ids 1..={})",
            config.expected_devices,
            config.max_device_id
        );

        let coordinator = Self {
            registry: DeviceRegistry::new(config.max_device_id),
            blinker: Blinker::new(config.indicator_interval),
            config,
            link,
            events,
            state: State::Discovering,
            poll_index: 0,
            retry_count: 0,
            state_entered_at: None,
            last_discover_at: None,
            pending_sample: None,
            indicator: Box::new(LogIndicator),
        };
        Ok((coordinator, handler))
    }

    /// Replaces the liveness indicator output.
    #[must_use]
    pub fn with_indicator(mut self, indicator: impl Indicator + 'static) -> Self {
        self.indicator = Box::new(indicator);
        self
    }

    /// Advances the state machine by one step.
    ///
    /// `now` is the monotonic time of this iteration; it is read once by the
    /// caller and used for every comparison in the step.
    pub fn tick(&mut self, now: Instant) {
        self.drain_events();

        let missing = self.any_missing();
        self.blinker.update(now, missing, self.indicator.as_mut());

        match self.state {
            State::Discovering => self.handle_discovering(now),
            State::Polling => self.handle_polling(now),
            State::WaitingData => self.handle_waiting_data(now),
        }
    }

    // ==================== Accessors ====================

    /// Current machine state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// The device table.
    #[must_use]
    pub const fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Timeouts seen for the current poll.
    #[must_use]
    pub const fn retry_count(&self) -> u8 {
        self.retry_count
    }

    /// Device currently being waited on, if any.
    #[must_use]
    pub fn current_target(&self) -> Option<u8> {
        match self.state {
            State::WaitingData => self.registry.registered_ids().get(self.poll_index).copied(),
            State::Discovering | State::Polling => None,
        }
    }

    /// Whether the liveness indicator is currently lit.
    #[must_use]
    pub const fn indicator_on(&self) -> bool {
        self.blinker.is_on()
    }

    /// Returns true if any expected device is not registered.
    #[must_use]
    pub fn any_missing(&self) -> bool {
        self.registry
            .any_missing(usize::from(self.config.expected_devices))
    }

    /// Summary rows for every id in range.
    #[must_use]
    pub fn summary(&self, now: Instant) -> Vec<SensorSummary> {
        self.registry.summary(now)
    }

    /// Measurement view of one device.
    #[must_use]
    pub fn device_view(&self, id: u8, now: Instant) -> Option<DeviceView> {
        self.registry.device_view(id, now)
    }

    // ==================== Event intake ====================

    fn drain_events(&mut self) {
        for event in self.events.drain() {
            match event {
                RxEvent::Registration { device_id, address } => {
                    self.process_registration(device_id, address);
                }
                RxEvent::SampleComplete(sample) => self.stash_sample(sample),
            }
        }
    }

    /// Holds on to the newest sample, except that a sample from the device
    /// being waited on is never displaced by one from another device.
    fn stash_sample(&mut self, sample: Reassembled) {
        let target = self.current_target();
        let holding_target = self
            .pending_sample
            .as_ref()
            .is_some_and(|held| Some(held.device_id) == target);

        if holding_target && Some(sample.device_id) != target {
            tracing::debug!(
                "ignoring sample from device {} while holding one from {}",
                sample.device_id,
                target.unwrap_or_default()
            );
            return;
        }
        if let Some(old) = self.pending_sample.replace(sample) {
            tracing::debug!("sample from device {} superseded", old.device_id);
        }
    }

    fn process_registration(&mut self, device_id: u8, address: LinkAddress) {
        match self.registry.register(device_id, address) {
            Registration::Accepted => {
                tracing::info!(
                    "registered device {} ({}/{}) at {}",
                    device_id,
                    self.registry.registered_count(),
                    self.config.expected_devices,
                    self.registry
                        .get(device_id)
                        .and_then(|record| record.link_address())
                        .map(ToString::to_string)
                        .unwrap_or_default()
                );
            }
            Registration::Duplicate => {
                tracing::trace!("device {} already registered", device_id);
            }
            Registration::OutOfRange => {
                tracing::warn!("ignoring registration from unknown device id {}", device_id);
            }
        }
    }

    // ==================== State handlers ====================

    fn handle_discovering(&mut self, now: Instant) {
        if self.discover_due(now) {
            self.broadcast_discover(now);
        }

        if self.registry.registered_count() >= usize::from(self.config.expected_devices) {
            tracing::info!(
                "all {} devices registered, starting poll cycle",
                self.config.expected_devices
            );
            self.poll_index = 0;
            self.state = State::Polling;
        }
    }

    fn handle_polling(&mut self, now: Instant) {
        let count = self.registry.registered_count();

        if self.poll_index >= count {
            if count > 0 && self.any_missing() {
                self.broadcast_discover(now);
            }
            self.poll_index = 0;
        }

        let ids = self.registry.registered_ids();
        while self.poll_index < ids.len() && !self.registry.is_registered(ids[self.poll_index]) {
            self.poll_index += 1;
        }

        let Some(&device_id) = ids.get(self.poll_index) else {
            if self.discover_due(now) {
                self.broadcast_discover(now);
            }
            self.poll_index = 0;
            return;
        };

        self.ensure_peer(device_id);
        self.pending_sample = None;
        self.send_poll(device_id);

        self.retry_count = 0;
        self.state_entered_at = Some(now);
        self.state = State::WaitingData;
    }

    fn handle_waiting_data(&mut self, now: Instant) {
        let Some(&expected) = self.registry.registered_ids().get(self.poll_index) else {
            self.state = State::Polling;
            return;
        };

        if let Some(sample) = self.pending_sample.take() {
            if sample.device_id == expected {
                self.accept_sample(expected, &sample, now);
                self.poll_index += 1;
                self.state = State::Polling;
            } else {
                tracing::debug!(
                    "discarding sample from device {} while waiting for {}",
                    sample.device_id,
                    expected
                );
            }
            return;
        }

        let entered = self.state_entered_at.unwrap_or(now);
        if now.saturating_duration_since(entered) < self.config.data_timeout {
            return;
        }

        if self.retry_count >= self.config.max_poll_retries {
            tracing::warn!(
                "device {} unresponsive after {} retries, evicting",
                expected,
                self.config.max_poll_retries
            );
            self.evict(expected);
            self.state = State::Polling;
        } else {
            self.retry_count += 1;
            tracing::warn!(
                "device {} timeout, retry {}/{}",
                expected,
                self.retry_count,
                self.config.max_poll_retries
            );
            self.send_poll(expected);
            self.state_entered_at = Some(now);
        }
    }

    // ==================== Helpers ====================

    fn discover_due(&self, now: Instant) -> bool {
        self.last_discover_at
            .is_none_or(|at| now.saturating_duration_since(at) >= self.config.discover_interval)
    }

    fn broadcast_discover(&mut self, now: Instant) {
        self.last_discover_at = Some(now);
        if let Err(e) = self.link.broadcast(&encode(&Message::Discover)) {
            tracing::warn!("send failed: DISCOVER broadcast: {}", e);
            return;
        }
        tracing::info!(
            "broadcast DISCOVER ({}/{} registered)",
            self.registry.registered_count(),
            self.config.expected_devices
        );
    }

    fn ensure_peer(&mut self, device_id: u8) {
        let Some(record) = self.registry.get(device_id) else {
            return;
        };
        if record.is_peer_admitted() {
            return;
        }
        let Some(address) = record.link_address().cloned() else {
            return;
        };

        match self.link.admit_peer(&address) {
            Ok(()) => self.registry.mark_peer_admitted(device_id),
            Err(e) => {
                tracing::warn!("failed to admit device {} at {}: {}", device_id, address, e);
            }
        }
    }

    fn send_poll(&mut self, device_id: u8) {
        let Some(address) = self
            .registry
            .get(device_id)
            .and_then(|record| record.link_address())
            .cloned()
        else {
            return;
        };

        tracing::debug!("POLL device {}", device_id);
        if let Err(e) = self
            .link
            .send_to(&address, &encode(&Message::Poll { device_id }))
        {
            tracing::warn!("send failed: POLL to device {}: {}", device_id, e);
        }
    }

    fn accept_sample(&mut self, device_id: u8, sample: &Reassembled, now: Instant) {
        let measurements = Measurements::from_le_bytes(&sample.payload);
        tracing::info!(
            "device {} -> {} measurements, first={}",
            device_id,
            measurements.len(),
            measurements.first().unwrap_or(0)
        );
        self.registry.record_sample(device_id, measurements, now);
    }

    fn evict(&mut self, device_id: u8) {
        if let Some(address) = self.registry.evict(device_id) {
            if let Err(e) = self.link.withdraw_peer(&address) {
                tracing::warn!("failed to withdraw device {} at {}: {}", device_id, address, e);
            }
        }
    }
}
