//! Periodic sampling into a double buffer.
//!
//! The sampler always fills the slot that is *not* marked ready and then
//! flips the ready index with a single atomic store. The transmit path only
//! ever reads the ready slot, so a slow acquisition never blocks or
//! invalidates a sample that is being sent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::protocol::MEASUREMENT_COUNT;
use crate::types::Measurements;

/// Produces one sample per call.
pub trait MeasurementSource: Send {
    /// Fills `readings` with a fresh sample.
    fn acquire(&mut self, readings: &mut [u16; MEASUREMENT_COUNT]);
}

/// Synthetic source producing a moving ramp.
///
/// Each sample advances the counter by `10 * device_id`; reading `i` is
/// `(counter + i) % 1024`.
#[derive(Debug, Clone)]
pub struct CounterSource {
    step: u32,
    counter: u32,
}

impl CounterSource {
    /// Creates a source for `device_id`.
    #[must_use]
    pub fn new(device_id: u8) -> Self {
        Self {
            step: 10 * u32::from(device_id),
            counter: 0,
        }
    }
}

impl MeasurementSource for CounterSource {
    fn acquire(&mut self, readings: &mut [u16; MEASUREMENT_COUNT]) {
        self.counter = self.counter.wrapping_add(self.step);
        for (i, reading) in (0u32..).zip(readings.iter_mut()) {
            *reading = (self.counter.wrapping_add(i) % 1024) as u16;
        }
    }
}

/// Two sample slots and the index of the ready one.
#[derive(Debug)]
pub struct SampleBuffer {
    slots: [Mutex<[u16; MEASUREMENT_COUNT]>; 2],
    ready: AtomicUsize,
}

impl SampleBuffer {
    /// Creates a buffer whose ready slot is all zeros.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [
                Mutex::new([0; MEASUREMENT_COUNT]),
                Mutex::new([0; MEASUREMENT_COUNT]),
            ],
            ready: AtomicUsize::new(0),
        }
    }

    /// Index of the slot currently marked ready.
    #[must_use]
    pub fn ready_index(&self) -> usize {
        self.ready.load(Ordering::Acquire)
    }

    /// Fills the back slot with `fill` and publishes it as ready.
    pub fn write_with(&self, fill: impl FnOnce(&mut [u16; MEASUREMENT_COUNT])) {
        let back = 1 - self.ready_index();
        {
            let mut slot = self.slots[back]
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            fill(&mut slot);
        }
        self.ready.store(back, Ordering::Release);
    }

    /// Copies the ready sample.
    #[must_use]
    pub fn snapshot(&self) -> Measurements {
        let slot = self.slots[self.ready_index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Measurements::from_slice(&slot[..])
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a [`MeasurementSource`] on a fixed period.
pub struct Sampler {
    source: Box<dyn MeasurementSource>,
    buffer: Arc<SampleBuffer>,
    period: Duration,
    last_sample_at: Option<Instant>,
}

impl Sampler {
    /// Creates a sampler writing into `buffer`.
    #[must_use]
    pub fn new(
        source: impl MeasurementSource + 'static,
        buffer: Arc<SampleBuffer>,
        period: Duration,
    ) -> Self {
        Self {
            source: Box::new(source),
            buffer,
            period,
            last_sample_at: None,
        }
    }

    /// Takes a sample if one is due. Returns true if a new sample became
    /// ready.
    pub fn update(&mut self, now: Instant) -> bool {
        let due = self
            .last_sample_at
            .is_none_or(|at| now.saturating_duration_since(at) >= self.period);
        if !due {
            return false;
        }

        self.last_sample_at = Some(now);
        let source = &mut self.source;
        self.buffer.write_with(|readings| source.acquire(readings));
        tracing::trace!("sample ready in slot {}", self.buffer.ready_index());
        true
    }
}
