//! # Logging subscriber.
//!
//! [`LogWriter`] turns runtime events into `tracing` records with structured
//! fields. Levels follow how much an operator should care:
//!
//! ```text
//! ERROR  session failed, connect failed, read failed
//! WARN   sensor abandoned, reading rejected, grace exceeded, subscriber trouble
//! INFO   connected, reconnect scheduled, shutdown
//! DEBUG  resolving, connecting, readout rendered
//! TRACE  reading stored
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Writes every event to the installed `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let sensor = e.sensor;
        let endpoint = e.endpoint.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::SensorResolving => {
                debug!(?sensor, endpoint, attempt = ?e.attempt, "resolving sensor endpoint");
            }
            EventKind::SensorConnecting => {
                debug!(?sensor, addr = ?e.addr, candidate = ?e.attempt, "connecting");
            }
            EventKind::ConnectFailed => {
                error!(?sensor, addr = ?e.addr, label = ?e.label, "connect failed: {reason}");
            }
            EventKind::SensorConnected => {
                info!(?sensor, endpoint, addr = ?e.addr, "connected");
            }
            EventKind::SessionFailed => {
                error!(?sensor, endpoint, label = ?e.label, attempt = ?e.attempt, "session failed: {reason}");
            }
            EventKind::ReconnectScheduled => {
                info!(?sensor, endpoint, delay_ms = ?e.delay_ms, after_attempt = ?e.attempt, "reconnect scheduled");
            }
            EventKind::SensorAbandoned => {
                warn!(?sensor, endpoint, "giving up on sensor: {reason}");
            }
            EventKind::ReadingStored => {
                trace!(?sensor, value = ?e.value, "reading stored");
            }
            EventKind::ReadingRejected => {
                warn!(?sensor, label = ?e.label, "reading rejected: {reason}");
            }
            EventKind::ReadFailed => {
                error!(?sensor, endpoint, label = ?e.label, rearm_ms = ?e.delay_ms, "read failed: {reason}");
            }
            EventKind::DisplayRendered => {
                debug!(value = ?e.value, count = ?e.count, "readout rendered");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!("all sensor agents stopped within grace");
            }
            EventKind::GraceExceeded => {
                warn!("grace period exceeded");
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                warn!(kind = ?e.kind, "subscriber trouble: {reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
