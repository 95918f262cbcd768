use std::sync::Arc;

use crate::{
    config::Config,
    display::{Aggregator, DisplaySettings, DisplayTrigger, ReadoutSink, StdoutSink},
    error::ConfigError,
    events::Bus,
    sensors::{Connect, ReadingStore, Resolve, SystemResolver, TcpConnector},
    subscribers::{LinkTracker, Subscribe},
};

use super::station::Station;

/// Builder for a [`Station`] with pluggable I/O.
///
/// Defaults: [`StdoutSink`], [`SystemResolver`] honoring `Config::ipv4_only`,
/// [`TcpConnector`], no extra subscribers. A [`LinkTracker`] is always added.
pub struct StationBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    sink: Option<Arc<dyn ReadoutSink>>,
    resolver: Option<Arc<dyn Resolve>>,
    connector: Option<Arc<dyn Connect>>,
}

impl StationBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            sink: None,
            resolver: None,
            connector: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (connections, readings, renders)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the readout destination.
    pub fn with_sink(mut self, sink: Arc<dyn ReadoutSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connect>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Validates the configuration and wires the station.
    ///
    /// Nothing is spawned here; tasks start in [`Station::run`].
    pub fn build(self) -> Result<Station, ConfigError> {
        self.cfg.validate()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let store = ReadingStore::new(self.cfg.sensor_count);
        let sink: Arc<dyn ReadoutSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(StdoutSink),
        };
        let aggregator = Arc::new(Aggregator::new(
            store.clone(),
            DisplaySettings {
                min_interval: self.cfg.min_display_interval,
                staleness_window: self.cfg.staleness_window,
            },
            sink,
        ));

        let links = Arc::new(LinkTracker::new(self.cfg.sensor_count));
        let mut subscribers = self.subscribers;
        subscribers.push(links.clone());

        let resolver: Arc<dyn Resolve> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(SystemResolver::new(self.cfg.ipv4_only)),
        };
        let connector: Arc<dyn Connect> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(TcpConnector),
        };

        Ok(Station {
            cfg: self.cfg,
            bus,
            store,
            aggregator,
            trigger: DisplayTrigger::new(),
            links,
            subscribers,
            resolver,
            connector,
        })
    }
}
