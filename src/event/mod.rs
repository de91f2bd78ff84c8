//! Receive-side events.
//!
//! The link's receive callback runs outside the coordinator loop and may
//! fire between any two of its statements. The two never share mutable
//! state: the callback owns the [`Reassembler`] and publishes small event
//! records on a bounded channel, and the coordinator drains that channel at
//! the start of every iteration. Each event is consumed exactly once.
//!
//! The callback never blocks: when the channel is full the event is dropped
//! and logged, which the poll-retry path recovers from.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::protocol::{Message, Reassembled, Reassembler, decode};
use crate::types::LinkAddress;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Event published by the receive callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// A sensor announced itself.
    Registration {
        /// Announced device id (not yet range-checked).
        device_id: u8,
        /// Source address of the `Register` frame.
        address: LinkAddress,
    },
    /// A sample finished reassembling.
    SampleComplete(Reassembled),
}

/// Creates a connected callback/loop pair.
#[must_use]
pub fn channel(capacity: usize) -> (RxHandler, RxEvents) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        RxHandler {
            reassembler: Reassembler::new(),
            events: tx,
        },
        RxEvents { rx },
    )
}

/// Callback side: decodes frames and publishes events.
#[derive(Debug)]
pub struct RxHandler {
    reassembler: Reassembler,
    events: mpsc::Sender<RxEvent>,
}

impl RxHandler {
    /// Handles one received frame.
    ///
    /// Malformed frames and messages the coordinator itself originates are
    /// dropped without any state change.
    pub fn on_receive(&mut self, source: &LinkAddress, frame: &[u8]) {
        let message = match decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("dropping frame from {}: {}", source, e);
                return;
            }
        };

        match message {
            Message::Register { device_id } => {
                tracing::info!("REGISTER from device {} at {}", device_id, source);
                self.publish(RxEvent::Registration {
                    device_id,
                    address: source.clone(),
                });
            }
            Message::Data(fragment) => {
                tracing::debug!(
                    "DATA from device {}, fragment {}/{} ({} bytes)",
                    fragment.device_id,
                    u16::from(fragment.fragment_index) + 1,
                    fragment.total_fragments,
                    fragment.payload.len()
                );
                if let Some(sample) = self.reassembler.push(&fragment) {
                    self.publish(RxEvent::SampleComplete(sample));
                }
            }
            Message::Discover | Message::Poll { .. } => {
                tracing::trace!("ignoring {:?} from {}", message.kind(), source);
            }
        }
    }

    fn publish(&self, event: RxEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!("event queue full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("event receiver dropped");
            }
        }
    }
}

/// Loop side: non-blocking event drain.
#[derive(Debug)]
pub struct RxEvents {
    rx: mpsc::Receiver<RxEvent>,
}

impl RxEvents {
    /// Takes the next pending event without waiting.
    ///
    /// Returns `None` when the queue is empty or every handler is gone.
    pub fn try_next(&mut self) -> Option<RxEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every pending event.
    pub fn drain(&mut self) -> Vec<RxEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
