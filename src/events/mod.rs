//! Runtime events: types and broadcast bus.
//!
//! Agents, the display engine and the station publish [`Event`]s on the
//! [`Bus`]; the station forwards them to the subscriber set.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
