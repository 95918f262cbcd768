//! # Event bus.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that many publishers (one per
//! sensor agent, plus the display engine and the station) never block.
//!
//! ```text
//! Agent 0 ──┐
//! Agent 1 ──┼──► Bus ──► station listener ──► SubscriberSet
//! Display ──┤
//! Station ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and drops the event when nobody listens.
//! - A receiver that falls more than `capacity` events behind skips the oldest.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes to every current receiver.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
