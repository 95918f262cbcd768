//! # Readout sinks.
//!
//! The aggregator renders through a [`ReadoutSink`] while holding the display
//! lock, so a sink never sees two renders at once.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

use crate::display::Readout;

/// Destination of rendered readouts.
pub trait ReadoutSink: Send + Sync + 'static {
    /// Shows `readout`, rendered at `at`.
    fn show(&self, at: Instant, readout: &Readout);
}

/// Writes `\t\t<readout>` lines to standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl ReadoutSink for StdoutSink {
    fn show(&self, _at: Instant, readout: &Readout) {
        let mut out = std::io::stdout().lock();
        if let Err(err) = writeln!(out, "\t\t{readout}").and_then(|_| out.flush()) {
            tracing::warn!(%err, "could not write readout");
        }
    }
}

/// Keeps every readout with the instant it was rendered.
#[derive(Debug, Default)]
pub struct RecordingSink {
    shown: Mutex<Vec<(Instant, Readout)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All readouts so far, oldest first.
    pub fn shown(&self) -> Vec<(Instant, Readout)> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Just the readout values, oldest first.
    pub fn readouts(&self) -> Vec<Readout> {
        self.shown().into_iter().map(|(_, r)| r).collect()
    }
}

impl ReadoutSink for RecordingSink {
    fn show(&self, at: Instant, readout: &Readout) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((at, *readout));
    }
}
