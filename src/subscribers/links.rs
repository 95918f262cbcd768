//! # Connected-sensor tracker.
//!
//! [`LinkTracker`] keeps the set of sensors that currently hold a connection,
//! using event sequence numbers to ignore out-of-order deliveries. It logs
//! once every time the full sensor set becomes connected, and the station
//! reads its snapshot when agents outlive the shutdown grace.
//!
//! ## Rules
//! - `SensorConnected` links a sensor.
//! - `SessionFailed`, `SensorAbandoned` and a `ReadFailed` caused by peer close unlink it.
//! - Events with `seq <= last_seq` for that sensor are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

#[derive(Debug, Clone)]
struct LinkState {
    last_seq: Option<u64>,
    linked: bool,
    endpoint: Option<Arc<str>>,
}

/// Tracks which sensors are connected.
#[derive(Debug)]
pub struct LinkTracker {
    total: usize,
    state: RwLock<HashMap<usize, LinkState>>,
}

impl LinkTracker {
    /// `total` is the configured sensor count.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies `ev` if it is newer than the last event seen for its sensor.
    ///
    /// Returns `true` if the linked state changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(sensor) = ev.sensor else {
            return false;
        };
        let next = match ev.kind {
            EventKind::SensorConnected => Some(true),
            EventKind::SessionFailed | EventKind::SensorAbandoned => Some(false),
            EventKind::ReadFailed if ev.label == Some("sensor_closed") => Some(false),
            _ => None,
        };

        let mut state = self.state.write().await;
        let entry = state.entry(sensor).or_insert(LinkState {
            last_seq: None,
            linked: false,
            endpoint: None,
        });
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);
        if ev.endpoint.is_some() {
            entry.endpoint = ev.endpoint.clone();
        }

        match next {
            Some(linked) if linked != entry.linked => {
                entry.linked = linked;
                if linked {
                    let count = state.values().filter(|s| s.linked).count();
                    if count == self.total {
                        tracing::info!(count, "all sensor nodes connected");
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Number of currently linked sensors.
    pub async fn linked_count(&self) -> usize {
        self.state.read().await.values().filter(|s| s.linked).count()
    }

    /// Linked sensors as `#index host:port`, sorted by index.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut linked: Vec<(usize, String)> = state
            .iter()
            .filter(|(_, s)| s.linked)
            .map(|(i, s)| (*i, format!("#{i} {}", s.endpoint.as_deref().unwrap_or("?"))))
            .collect();
        linked.sort_unstable_by_key(|(i, _)| *i);
        linked.into_iter().map(|(_, label)| label).collect()
    }
}

#[async_trait]
impl Subscribe for LinkTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "links"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;

    fn connected(i: usize) -> Event {
        Event::new(EventKind::SensorConnected)
            .with_sensor(i)
            .with_endpoint(format!("127.0.0.1:{}", 5000 + i))
    }

    #[tokio::test]
    async fn tracks_connect_and_loss() {
        let tracker = LinkTracker::new(2);
        assert!(tracker.update(&connected(0)).await);
        assert!(tracker.update(&connected(1)).await);
        assert_eq!(tracker.linked_count().await, 2);

        let closed = Event::new(EventKind::ReadFailed)
            .with_sensor(1)
            .with_error(&SensorError::Closed);
        assert!(tracker.update(&closed).await);
        assert_eq!(tracker.snapshot().await, vec!["#0 127.0.0.1:5000".to_string()]);
    }

    #[tokio::test]
    async fn stale_events_are_ignored() {
        let tracker = LinkTracker::new(1);
        let early = Event::new(EventKind::SessionFailed).with_sensor(0);
        let late = connected(0);
        assert!(tracker.update(&late).await);
        assert!(!tracker.update(&early).await);
        assert_eq!(tracker.linked_count().await, 1);
    }

    #[tokio::test]
    async fn parse_errors_do_not_unlink() {
        let tracker = LinkTracker::new(1);
        tracker.update(&connected(0)).await;
        let rejected = Event::new(EventKind::ReadingRejected).with_sensor(0);
        assert!(!tracker.update(&rejected).await);
        assert_eq!(tracker.linked_count().await, 1);
    }
}
