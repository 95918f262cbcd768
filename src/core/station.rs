//! # Station: orchestrates sensor agents, the display engine and shutdown.
//!
//! The [`Station`] owns the event bus, the reading store, the aggregator and
//! the subscriber list. [`Station::run`] spawns one [`ConnectionAgent`] per
//! configured sensor plus the [`DisplayEngine`], then waits for a termination
//! signal and stops everything within [`Config::grace`].
//!
//! ## High-level architecture
//! ```text
//! Preparation:
//!   - subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - render the no-data sentinel
//!
//! Spawn:
//!   DisplayEngine::run(child token)
//!   endpoint[0]  endpoint[1]  ...  endpoint[N-1]
//!       │            │                   │
//!       └──► ConnectionAgent::new(endpoint, slot handle, params, deps)
//!                    └──► set.spawn(agent.run(child token))
//!
//! Data flow:
//!   agent ── record ──► ReadingStore ◄── summarize ── Aggregator ──► sink
//!     └──── trigger ───────────────────► DisplayEngine ─┘
//!
//! Shutdown path:
//!   shutdown future completes (OS signal in `run`)
//!             └─► Bus.publish(ShutdownRequested)
//!             └─► runtime_token.cancel()   → propagates to child tokens
//!             └─► wait_all_with_grace(cfg.grace):
//!                    ├─ Ok (all joined)    → Bus.publish(AllStoppedWithin)
//!                    └─ Timeout exceeded   → Bus.publish(GraceExceeded)
//!                                            (LinkTracker.snapshot() for stuck sensors)
//!             └─► render the sentinel, drain and stop subscribers
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use thermovisor::{Config, LogWriter, Station, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let station = Station::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     station.run().await?;
//!     Ok(())
//! }
//! ```

use std::{future::Future, sync::Arc};

use tokio::{
    sync::broadcast::error::RecvError,
    task::{JoinHandle, JoinSet},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{
        agent::{AgentDeps, AgentExit, AgentParams, ConnectionAgent},
        builder::StationBuilder,
        shutdown,
    },
    display::{Aggregator, DisplayEngine, DisplayTrigger, Readout},
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    sensors::{Connect, ReadingStore, Resolve},
    subscribers::{LinkTracker, Subscribe, SubscriberSet},
};

/// Coordinates sensor agents, display, event delivery and graceful shutdown.
pub struct Station {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) store: Arc<ReadingStore>,
    pub(super) aggregator: Arc<Aggregator>,
    pub(super) trigger: DisplayTrigger,
    pub(super) links: Arc<LinkTracker>,
    pub(super) subscribers: Vec<Arc<dyn Subscribe>>,
    pub(super) resolver: Arc<dyn Resolve>,
    pub(super) connector: Arc<dyn Connect>,
}

impl Station {
    /// Starts building a station for `cfg`.
    pub fn builder(cfg: Config) -> StationBuilder {
        StationBuilder::new(cfg)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus shared with every agent.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn store(&self) -> &Arc<ReadingStore> {
        &self.store
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Tracker of connected sensors (also registered as a subscriber).
    pub fn links(&self) -> &Arc<LinkTracker> {
        &self.links
    }

    /// Runs until SIGINT, SIGTERM or SIGQUIT (Ctrl-C on other platforms).
    pub async fn run(&self) -> Result<(), RuntimeError> {
        self.run_until(async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "termination signal received"),
                Err(err) => {
                    tracing::error!(%err, "cannot listen for termination signals");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
    }

    /// Runs until `shutdown` completes, then stops gracefully.
    ///
    /// Abandoned sensors do not end the run: the station keeps displaying
    /// whatever the remaining sensors report.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        let listener_token = CancellationToken::new();
        let listener = self.subscriber_listener(listener_token.clone());
        let runtime_token = CancellationToken::new();

        self.render_sentinel();

        let engine = DisplayEngine::new(
            Arc::clone(&self.aggregator),
            self.trigger.clone(),
            self.bus.clone(),
        );
        let display = tokio::spawn(engine.run(runtime_token.child_token()));

        let mut set = JoinSet::new();
        self.spawn_agents(&mut set, &runtime_token);
        self.drive_shutdown(&mut set, shutdown).await;

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        runtime_token.cancel();
        let res = self.wait_all_with_grace(&mut set, display).await;

        self.render_sentinel();
        listener_token.cancel();
        let _ = listener.await;
        res
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// On `stop` the backlog is forwarded and the subscriber queues drained.
    fn subscriber_listener(&self, stop: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        })
    }

    /// Spawns one agent per sensor slot.
    fn spawn_agents(&self, set: &mut JoinSet<AgentExit>, runtime_token: &CancellationToken) {
        let params = AgentParams::from(&self.cfg);
        let deps = AgentDeps {
            resolver: Arc::clone(&self.resolver),
            connector: Arc::clone(&self.connector),
            trigger: self.trigger.clone(),
            bus: self.bus.clone(),
        };

        for (index, endpoint) in self.cfg.endpoints().into_iter().enumerate() {
            let Some(slot) = self.store.slot(index) else {
                continue;
            };
            let agent = ConnectionAgent::new(endpoint, slot, params.clone(), deps.clone());
            set.spawn(agent.run(runtime_token.child_token()));
        }
    }

    /// Reaps agent exits until `shutdown` completes.
    async fn drive_shutdown<F>(&self, set: &mut JoinSet<AgentExit>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => return,
                Some(joined) = set.join_next() => {
                    if let Err(err) = joined {
                        tracing::error!(%err, "sensor agent task failed");
                    }
                }
            }
        }
    }

    /// Waits for the agents and the display engine within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the sensors still linked.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<AgentExit>,
        display: JoinHandle<()>,
    ) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        if grace.is_zero() {
            set.abort_all();
            display.abort();
            return Ok(());
        }

        let done = async {
            while set.join_next().await.is_some() {}
            let _ = display.await;
        };

        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                set.abort_all();
                let stuck = self.links.snapshot().await;
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    fn render_sentinel(&self) {
        self.aggregator.show_sentinel(Instant::now());
        self.bus.publish(Event::rendered(Readout::NoData, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RecordingSink;
    use crate::error::SensorError;
    use crate::sensors::{SensorEndpoint, SensorStream};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream};

    struct PortResolver;

    #[async_trait]
    impl Resolve for PortResolver {
        async fn resolve(&self, endpoint: &SensorEndpoint) -> Result<Vec<SocketAddr>, SensorError> {
            Ok(vec![SocketAddr::from(([127, 0, 0, 1], endpoint.port))])
        }
    }

    /// Connects to in-memory peers by port; unknown ports refuse.
    #[derive(Default)]
    struct PortConnector {
        peers: Mutex<HashMap<u16, DuplexStream>>,
    }

    #[async_trait]
    impl Connect for PortConnector {
        async fn connect(&self, addr: SocketAddr) -> io::Result<Box<dyn SensorStream>> {
            match self.peers.lock().unwrap().remove(&addr.port()) {
                Some(stream) => Ok(Box::new(stream)),
                None => Err(io::ErrorKind::ConnectionRefused.into()),
            }
        }
    }

    fn station(cfg: Config, connector: Arc<PortConnector>, sink: Arc<RecordingSink>) -> Station {
        Station::builder(cfg)
            .with_sink(sink)
            .with_resolver(Arc::new(PortResolver))
            .with_connector(connector)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn all_sensors_abandoned_still_runs_until_shutdown() {
        let sink = Arc::new(RecordingSink::new());
        let cfg = Config {
            sensor_count: 2,
            ..Config::default()
        };
        let station = station(cfg, Arc::new(PortConnector::default()), sink.clone());

        let res = station
            .run_until(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert!(res.is_ok());
        assert_eq!(sink.readouts(), vec![Readout::NoData, Readout::NoData]);
        assert_eq!(station.store().summarize(Instant::now(), Duration::from_secs(600)).count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mean_excludes_sensor_that_never_connected() {
        let sink = Arc::new(RecordingSink::new());
        let connector = Arc::new(PortConnector::default());
        let mut servers = Vec::new();
        for (port, value) in [(5000u16, "10.0"), (5001, "20.0"), (5003, "30.0")] {
            let (client, mut server) = tokio::io::duplex(64);
            server.write_all(value.as_bytes()).await.unwrap();
            connector.peers.lock().unwrap().insert(port, client);
            servers.push(server);
        }

        let station = station(Config::default(), connector, sink.clone());
        let links = Arc::clone(station.links());
        let res = station
            .run_until(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                assert_eq!(links.linked_count().await, 3);
            })
            .await;

        assert!(res.is_ok());
        assert_eq!(
            sink.readouts(),
            vec![Readout::NoData, Readout::Celsius(20.0), Readout::NoData]
        );
        assert_eq!(station.store().get(2), None);
        drop(servers);
    }

    #[test]
    fn invalid_config_is_rejected_at_build() {
        let cfg = Config {
            sensor_count: 0,
            ..Config::default()
        };
        let err = Station::builder(cfg).build().err();
        assert_eq!(err, Some(crate::error::ConfigError::NoSensors));
    }
}
