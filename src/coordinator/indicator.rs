//! Liveness indicator.
//!
//! Blinks while any expected device is unregistered and stays off
//! otherwise. Purely observational.

use std::time::{Duration, Instant};

/// Output of the liveness indicator (an LED on hardware).
pub trait Indicator: Send {
    /// Switches the indicator on or off.
    fn set(&mut self, on: bool);
}

/// Indicator that only logs its transitions.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set(&mut self, on: bool) {
        tracing::trace!("indicator {}", if on { "on" } else { "off" });
    }
}

/// Blink timing for an [`Indicator`].
#[derive(Debug)]
pub(crate) struct Blinker {
    interval: Duration,
    on: bool,
    last_toggle: Option<Instant>,
}

impl Blinker {
    pub(crate) const fn new(interval: Duration) -> Self {
        Self {
            interval,
            on: false,
            last_toggle: None,
        }
    }

    pub(crate) const fn is_on(&self) -> bool {
        self.on
    }

    /// Advances the blink state; `output` only sees actual changes.
    pub(crate) fn update(&mut self, now: Instant, missing: bool, output: &mut dyn Indicator) {
        if missing {
            let due = self
                .last_toggle
                .is_none_or(|at| now.saturating_duration_since(at) >= self.interval);
            if due {
                self.last_toggle = Some(now);
                self.on = !self.on;
                output.set(self.on);
            }
        } else if self.on {
            self.on = false;
            output.set(false);
        }
    }
}
