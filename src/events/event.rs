//! # Runtime events emitted by sensor agents, the display engine and the station.
//!
//! [`EventKind`] falls in four groups:
//! - **Connection events**: resolving, connecting, connected, failures, abandonment
//! - **Data events**: readings stored or rejected, read failures
//! - **Display events**: a readout was rendered
//! - **Runtime events**: shutdown and subscriber health
//!
//! ## Ordering
//! Every event gets a globally unique, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use thermovisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ConnectFailed)
//!     .with_sensor(2)
//!     .with_endpoint("127.0.0.1:5002")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.sensor, Some(2));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::display::Readout;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Connection events ===
    /// Agent started resolving its endpoint.
    ///
    /// Sets: `sensor`, `endpoint`, `attempt` (session number, 1-based)
    SensorResolving,

    /// Agent is trying one candidate address.
    ///
    /// Sets: `sensor`, `addr`, `attempt` (candidate position, 1-based)
    SensorConnecting,

    /// One candidate address failed; the next one (if any) follows.
    ///
    /// Sets: `sensor`, `addr`, `reason`, `label`
    ConnectFailed,

    /// Connection established; the receive loop starts.
    ///
    /// Sets: `sensor`, `endpoint`, `addr`
    SensorConnected,

    /// Session failed as a whole (resolution, exhaustion, or lost connection).
    ///
    /// Sets: `sensor`, `endpoint`, `reason`, `label`, `attempt`
    SessionFailed,

    /// Reconnect scheduled after a failed session.
    ///
    /// Sets: `sensor`, `endpoint`, `delay_ms`, `attempt`
    ReconnectScheduled,

    /// Agent gave up on its slot for good.
    ///
    /// Sets: `sensor`, `endpoint`, `reason`
    SensorAbandoned,

    // === Data events ===
    /// A reading was stored in the slot.
    ///
    /// Sets: `sensor`, `value`
    ReadingStored,

    /// A payload could not be parsed; the previous reading is kept.
    ///
    /// Sets: `sensor`, `reason`, `label`
    ReadingRejected,

    /// A read failed or the peer closed the connection.
    ///
    /// Sets: `sensor`, `endpoint`, `reason`, `label`, `delay_ms` (pause before re-arming)
    ReadFailed,

    // === Display events ===
    /// A readout was rendered.
    ///
    /// Sets: `value` (`None` for the no-data sentinel), `count` (fresh sensors)
    DisplayRendered,

    // === Runtime events ===
    /// Shutdown requested (OS signal or caller).
    ShutdownRequested,

    /// All agents stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some agents did not stop in time.
    GraceExceeded,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (subscriber name and panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Sensor slot index.
    pub sensor: Option<usize>,
    /// Configured `host:port` of the slot.
    pub endpoint: Option<Arc<str>>,
    /// Resolved candidate address.
    pub addr: Option<SocketAddr>,
    /// Session or candidate number (1-based).
    pub attempt: Option<u32>,
    /// Delay before the next action, in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Stable error label (see `SensorError::as_label`).
    pub label: Option<&'static str>,
    /// Temperature value.
    pub value: Option<f64>,
    /// Number of readings behind a rendered mean.
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            sensor: None,
            endpoint: None,
            addr: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            label: None,
            value: None,
            count: None,
        }
    }

    #[inline]
    pub fn with_sensor(mut self, index: usize) -> Self {
        self.sensor = Some(index);
        self
    }

    #[inline]
    pub fn with_endpoint(mut self, endpoint: impl Into<Arc<str>>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[inline]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an error's label and message.
    #[inline]
    pub fn with_error(mut self, err: &crate::error::SensorError) -> Self {
        self.label = Some(err.as_label());
        self.reason = Some(err.to_string().into());
        self
    }

    #[inline]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Creates a `DisplayRendered` event for `readout` computed from `count` readings.
    pub fn rendered(readout: Readout, count: usize) -> Self {
        let mut ev = Event::new(EventKind::DisplayRendered);
        ev.value = readout.celsius();
        ev.count = Some(count);
        ev
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }
}
