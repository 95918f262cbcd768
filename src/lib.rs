//! # thermovisor
//!
//! **Thermovisor** aggregates temperatures from a fixed set of TCP sensor
//! nodes and displays the mean of the fresh readings, at most once per
//! display interval.
//!
//! Every sensor slot is served by its own connection agent, which resolves
//! the node, connects with fallback across candidate addresses and then
//! keeps one read outstanding. Readings land in a shared store; a single
//! display engine turns them into readouts.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   sensor #0          sensor #1          sensor #N-1
//!  host:base+0        host:base+1        host:base+N-1
//!       │ TCP              │ TCP              │ TCP
//!       ▼                  ▼                  ▼
//! ConnectionAgent    ConnectionAgent    ConnectionAgent
//!  (receive loop)     (receive loop)     (receive loop)
//!    │       │          │       │          │       │
//!  record  trigger    record  trigger    record  trigger
//!    ▼       │          ▼       │          ▼       │
//! ┌──────────┴──────────────────┴──────────────────┴──────┐
//! │ ReadingStore (one Option<Reading> per slot)           │
//! └──────────────────────────┬────────────────────────────┘
//!                            │ summarize(now)
//!                            ▼
//!        DisplayEngine ──► Aggregator::maybe_display
//!                          (rate limit, staleness, mean)
//!                            │
//!                            ▼
//!                  ReadoutSink (stdout: "\t\t21.3 °C")
//! ```
//!
//! Agents, the display engine and the station publish lifecycle [`Event`]s
//! on a [`Bus`]; the station fans them out to [`Subscribe`] implementations
//! such as [`LogWriter`] and [`LinkTracker`].
//!
//! ### Agent lifecycle
//! ```text
//! Idle ─► Resolving ─► Connecting(0..n) ─► Receiving
//!             │              │                 │ read error / peer closed
//!             └─ failure ────┘                 ├─ Never:     log, re-arm read
//!                   │                          └─ OnFailure: end session
//!                   ├─ ReconnectPolicy::Never     ─► Abandoned
//!                   └─ ReconnectPolicy::OnFailure ─► backoff ─► Resolving
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Orchestration** | Spawn agents and the display, stop on signal with grace. | [`Station`], [`StationBuilder`]             |
//! | **Sensors**       | Resolution, connection, framing, reading storage.        | [`Resolve`], [`Connect`], [`ReadingStore`]  |
//! | **Display**       | Rate-limited mean of fresh readings.                     | [`Aggregator`], [`DisplayEngine`]           |
//! | **Policies**      | Reconnect and backoff strategies.                        | [`ReconnectPolicy`], [`BackoffPolicy`]      |
//! | **Subscriber API**| Hook into runtime events (logging, link tracking).       | [`Subscribe`]                               |
//! | **Errors**        | Typed errors with stable labels.                         | [`SensorError`], [`RuntimeError`]           |
//! | **Configuration** | Centralize runtime settings.                             | [`Config`]                                  |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use thermovisor::{Config, LogWriter, ReconnectPolicy, Station, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         reconnect: ReconnectPolicy::OnFailure,
//!         grace: Duration::from_secs(2),
//!         ..Config::default()
//!     };
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let station = Station::builder(cfg).with_subscribers(subs).build()?;
//!
//!     // Runs until SIGINT/SIGTERM/SIGQUIT.
//!     station.run().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod display;
mod error;
mod events;
mod policies;
mod sensors;
mod subscribers;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_MAX_READ_LEN};
pub use crate::core::{
    AgentDeps, AgentExit, AgentParams, AgentState, ConnectionAgent, Station, StationBuilder,
    wait_for_shutdown_signal,
};
pub use display::{
    Aggregator, DisplayEngine, DisplayOutcome, DisplaySettings, DisplayTrigger, Readout,
    ReadoutSink, RecordingSink, StdoutSink,
};
pub use error::{ConfigError, RuntimeError, SensorError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, ReconnectPolicy};
pub use sensors::{
    Connect, FrameDecoder, Framing, Reading, ReadingStore, Resolve, SensorEndpoint, SensorStream,
    SlotHandle, Summary, SystemResolver, TcpConnector, parse_reading,
};
pub use subscribers::{LinkTracker, LogWriter, Subscribe, SubscriberSet};
