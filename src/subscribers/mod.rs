//! # Event subscribers.
//!
//! ```text
//! Bus ──► station listener ──► SubscriberSet::emit(&Event)
//!                                   ├──► [queue] ──► LogWriter   (tracing output)
//!                                   ├──► [queue] ──► LinkTracker (connected sensors)
//!                                   └──► [queue] ──► custom ...
//! ```
//!
//! Implement [`Subscribe`] to hook metrics or alerting into the station.

mod links;
mod log;
mod subscriber;
mod subscriber_set;

pub use links::LinkTracker;
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
