//! Coordinator configuration.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::event::DEFAULT_EVENT_CAPACITY;
use crate::protocol::MAX_DEVICES;

/// Default interval between discovery broadcasts.
pub const DEFAULT_DISCOVER_INTERVAL: Duration = Duration::from_millis(500);

/// Default time to wait for a sample after a poll.
pub const DEFAULT_DATA_TIMEOUT: Duration = Duration::from_millis(200);

/// Default number of re-polls before a device is evicted.
pub const DEFAULT_MAX_POLL_RETRIES: u8 = 5;

/// Default toggle period of the liveness indicator.
pub const DEFAULT_INDICATOR_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for the coordinator state machine.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Number of devices to register before polling starts.
    pub expected_devices: u8,
    /// Highest accepted device id; ids run from 1.
    pub max_device_id: u8,
    /// Minimum time between discovery broadcasts while discovering.
    pub discover_interval: Duration,
    /// Time to wait for a complete sample after each poll.
    pub data_timeout: Duration,
    /// Re-polls after the first timeout before eviction.
    pub max_poll_retries: u8,
    /// Toggle period of the liveness indicator.
    pub indicator_interval: Duration,
    /// Capacity of the receive event channel.
    pub event_capacity: usize,
}

impl CoordinatorConfig {
    /// Creates a configuration with default timing for `expected_devices`.
    #[must_use]
    pub const fn new(expected_devices: u8) -> Self {
        Self {
            expected_devices,
            max_device_id: MAX_DEVICES,
            discover_interval: DEFAULT_DISCOVER_INTERVAL,
            data_timeout: DEFAULT_DATA_TIMEOUT,
            max_poll_retries: DEFAULT_MAX_POLL_RETRIES,
            indicator_interval: DEFAULT_INDICATOR_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the highest accepted device id.
    #[must_use]
    pub const fn max_device_id(mut self, id: u8) -> Self {
        self.max_device_id = id;
        self
    }

    /// Sets the discovery broadcast interval.
    #[must_use]
    pub const fn discover_interval(mut self, interval: Duration) -> Self {
        self.discover_interval = interval;
        self
    }

    /// Sets the per-poll data timeout.
    #[must_use]
    pub const fn data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = timeout;
        self
    }

    /// Sets the number of retries before eviction.
    #[must_use]
    pub const fn max_poll_retries(mut self, retries: u8) -> Self {
        self.max_poll_retries = retries;
        self
    }

    /// Sets the liveness indicator period.
    #[must_use]
    pub const fn indicator_interval(mut self, interval: Duration) -> Self {
        self.indicator_interval = interval;
        self
    }

    /// Sets the receive event channel capacity.
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if no devices are expected, the id range
    /// is empty, or more devices are expected than ids exist.
    pub fn validate(&self) -> Result<()> {
        if self.expected_devices == 0 {
            return Err(invalid("expected_devices must be at least 1"));
        }
        if self.max_device_id == 0 {
            return Err(invalid("max_device_id must be at least 1"));
        }
        if self.expected_devices > self.max_device_id {
            return Err(invalid(format!(
                "expected_devices ({}) exceeds max_device_id ({})",
                self.expected_devices, self.max_device_id
            )));
        }
        if self.event_capacity == 0 {
            return Err(invalid("event_capacity must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        reason: reason.into(),
    }
}
