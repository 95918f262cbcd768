//! # Aggregator: rate-limited mean of fresh readings.
//!
//! [`Aggregator::maybe_display`] is safe to call from any task; a single
//! mutex serializes every render.
//!
//! ```text
//! maybe_display(now)
//!   ├─► lock
//!   ├─► now − last_display < min_interval ──► Suppressed { next_allowed }
//!   ├─► summarize store (value set AND now − at < staleness_window)
//!   ├─► count == 0 ──► Readout::NoData
//!   │   count  > 0 ──► Readout::Celsius(sum / count)
//!   ├─► sink.show(now, readout)
//!   └─► last_display = now, unlock
//! ```
//!
//! ## Rules
//! - Two renders are always at least `min_interval` apart.
//! - `now` never moves backwards across renders: a `now` at or before the
//!   last render is suppressed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::display::{Readout, ReadoutSink};
use crate::sensors::ReadingStore;

/// Pacing and staleness for the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Minimum time between two rendered readouts.
    pub min_interval: Duration,
    /// Readings at least this old are excluded.
    pub staleness_window: Duration,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            staleness_window: Duration::from_secs(600),
        }
    }
}

/// Result of one [`Aggregator::maybe_display`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayOutcome {
    /// A readout was rendered from `count` fresh readings.
    Rendered { readout: Readout, count: usize },
    /// Too soon after the previous render; nothing was shown.
    Suppressed { next_allowed: Instant },
}

#[derive(Debug, Default)]
struct AggregationState {
    last_display: Option<Instant>,
}

/// Computes and renders the displayed temperature.
pub struct Aggregator {
    store: Arc<ReadingStore>,
    settings: DisplaySettings,
    sink: Arc<dyn ReadoutSink>,
    state: Mutex<AggregationState>,
}

impl Aggregator {
    pub fn new(
        store: Arc<ReadingStore>,
        settings: DisplaySettings,
        sink: Arc<dyn ReadoutSink>,
    ) -> Self {
        Self {
            store,
            settings,
            sink,
            state: Mutex::new(AggregationState::default()),
        }
    }

    /// Renders the current mean unless the previous render is too recent.
    pub fn maybe_display(&self, now: Instant) -> DisplayOutcome {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = state.last_display {
            let next_allowed = last + self.settings.min_interval;
            if now <= last || now < next_allowed {
                return DisplayOutcome::Suppressed {
                    next_allowed: next_allowed.max(last + Duration::from_millis(1)),
                };
            }
        }

        let summary = self.store.summarize(now, self.settings.staleness_window);
        let readout = Readout::from_mean(summary.mean());
        self.sink.show(now, &readout);
        state.last_display = Some(now);

        DisplayOutcome::Rendered {
            readout,
            count: summary.count,
        }
    }

    /// Renders the no-data sentinel regardless of pacing (startup, shutdown).
    pub fn show_sentinel(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.sink.show(now, &Readout::NoData);
        state.last_display = Some(state.last_display.map_or(now, |last| last.max(now)));
    }

    /// Instant of the latest render, if any.
    pub fn last_display(&self) -> Option<Instant> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_display
    }

    pub fn settings(&self) -> DisplaySettings {
        self.settings
    }

    pub fn store(&self) -> &Arc<ReadingStore> {
        &self.store
    }
}
