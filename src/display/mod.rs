//! Aggregation and display.
//!
//! ## Contents
//! - [`Readout`] the rendered value (mean or the no-data sentinel)
//! - [`ReadoutSink`] where readouts go ([`StdoutSink`], [`RecordingSink`])
//! - [`Aggregator`] lock, rate limit, staleness filter, mean, render
//! - [`DisplayEngine`] / [`DisplayTrigger`] the task that calls the aggregator
//!   on triggers, trailing edges and staleness deadlines

mod aggregator;
mod engine;
mod readout;
mod sink;

pub use aggregator::{Aggregator, DisplayOutcome, DisplaySettings};
pub use engine::{DisplayEngine, DisplayTrigger};
pub use readout::Readout;
pub use sink::{ReadoutSink, RecordingSink, StdoutSink};
