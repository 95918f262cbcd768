//! # Display engine.
//!
//! One task owns the call sites of [`Aggregator::maybe_display`]. Agents never
//! call it inline: they store their reading and pull a [`DisplayTrigger`],
//! which coalesces bursts into a single wakeup.
//!
//! ```text
//! loop {
//!   wait for: trigger | wake deadline | cancellation
//!   maybe_display(now)
//!     ├─ Rendered   ─► publish DisplayRendered
//!     │                wake = earliest instant a fresh reading turns stale
//!     └─ Suppressed ─► wake = next_allowed (trailing render)
//! }
//! ```
//!
//! ## Rules
//! - A trigger suppressed by pacing is never lost: a trailing render follows
//!   at `next_allowed` and reflects every update received meanwhile.
//! - The display reverts on its own once readings age out, without traffic.
//! - With no triggers and no fresh readings the engine stays silent.

use std::sync::Arc;

use tokio::{sync::Notify, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::display::{Aggregator, DisplayOutcome};
use crate::events::{Bus, Event};

/// Wakes the display engine. Cheap to clone; pulling it never blocks.
#[derive(Clone, Debug, Default)]
pub struct DisplayTrigger(Arc<Notify>);

impl DisplayTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a display pass. Several pulls before the engine wakes count as one.
    pub fn notify(&self) {
        self.0.notify_one();
    }

    async fn notified(&self) {
        self.0.notified().await;
    }
}

/// Task driving the aggregator.
pub struct DisplayEngine {
    aggregator: Arc<Aggregator>,
    trigger: DisplayTrigger,
    bus: Bus,
}

impl DisplayEngine {
    pub fn new(aggregator: Arc<Aggregator>, trigger: DisplayTrigger, bus: Bus) -> Self {
        Self {
            aggregator,
            trigger,
            bus,
        }
    }

    /// Runs one display pass at `now` and returns when the engine should wake next.
    pub fn step(&self, now: Instant) -> Option<Instant> {
        match self.aggregator.maybe_display(now) {
            DisplayOutcome::Rendered { readout, count } => {
                self.bus.publish(Event::rendered(readout, count));
                let window = self.aggregator.settings().staleness_window;
                self.aggregator.store().next_expiry(now, window)
            }
            DisplayOutcome::Suppressed { next_allowed } => Some(next_allowed),
        }
    }

    /// Runs until `token` is cancelled.
    pub async fn run(self, token: CancellationToken) {
        let mut wake: Option<Instant> = None;

        loop {
            let deadline = async {
                match wake {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.trigger.notified() => {}
                _ = deadline => {}
            }
            wake = self.step(Instant::now());
        }
    }
}
