//! Reconnect and pacing policies for sensor agents.
//!
//! ## Contents
//! - [`ReconnectPolicy`] whether a failed session goes back to resolving
//! - [`BackoffPolicy`] how long to wait between reconnects / re-armed reads
//! - [`JitterPolicy`] randomization spread over the backoff delay
//!
//! ## Wiring
//! ```text
//! Config { reconnect, backoff, .. }
//!      └─► core::agent::ConnectionAgent uses:
//!           - reconnect to decide abandon/retry after a failed session
//!           - backoff.next(n) to delay the n-th consecutive retry or re-armed read
//! ```
//!
//! ## Defaults
//! - `ReconnectPolicy::Never`: a slot that cannot connect is abandoned.
//! - `BackoffPolicy::default()` → first=1s, factor=2.0, max=60s, jitter=None.

mod backoff;
mod jitter;
mod reconnect;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use reconnect::ReconnectPolicy;
