//! Runtime core: orchestration and lifecycle.
//!
//! The public API of this module is [`Station`] (built through
//! [`StationBuilder`]) and the [`ConnectionAgent`] it spawns per sensor.
//!
//! Internal modules:
//! - [`agent`]: one sensor slot: resolve, connect with fallback, receive loop, reconnect policy;
//! - [`station`]: spawns agents and the display engine, handles shutdown;
//! - [`builder`]: validates configuration and wires pluggable I/O;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod agent;
mod builder;
mod shutdown;
mod station;

pub use agent::{AgentDeps, AgentExit, AgentParams, AgentState, ConnectionAgent};
pub use builder::StationBuilder;
pub use shutdown::wait_for_shutdown_signal;
pub use station::Station;
