//! # ConnectionAgent: one sensor slot, one task.
//!
//! The agent owns its slot's connection and the slot's write handle. It
//! resolves the endpoint, tries the candidate addresses in order, then runs
//! an explicit receive loop until the session fails or the token is cancelled.
//!
//! ## State machine
//! ```text
//! Idle ─► Resolving ─► Connecting(0) ─► Connecting(1) ─► ... ─► Receiving
//!             │               │                 │
//!             └── resolve ────┴── exhausted ────┘
//!                 failed              │
//!                                     ▼
//!              ReconnectPolicy::Never     ─► Abandoned
//!              ReconnectPolicy::OnFailure ─► backoff ─► Resolving
//! ```
//!
//! ## Receive loop
//! ```text
//! loop {
//!   read(buf) ─► n bytes ─► decode ─► Ok(v)  ─► slot.record(v, now) ─► trigger display
//!             │                    └► Err    ─► ReadingRejected (previous value kept)
//!             ├► 0 bytes ─► Closed ┐
//!             └► io error ─► Read  ┴► Never:     ReadFailed, paced re-arm on the same socket
//!                                     OnFailure: end session
//! }
//! ```
//!
//! ## Rules
//! - Exactly one read is outstanding per agent.
//! - Value and timestamp are stored as one pair.
//! - Display is only ever triggered, never called inline.
//! - Every await also observes the cancellation token.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{io::AsyncReadExt, sync::watch, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    display::DisplayTrigger,
    error::SensorError,
    events::{Bus, Event, EventKind},
    policies::{BackoffPolicy, ReconnectPolicy},
    sensors::{Connect, FrameDecoder, Framing, Resolve, SensorEndpoint, SensorStream, SlotHandle},
};

/// Observable state of a [`ConnectionAgent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentState {
    /// Not started yet, or stopped by cancellation.
    Idle,
    /// Resolving the endpoint.
    Resolving,
    /// Trying the candidate at this position.
    Connecting { candidate: usize },
    /// Connected; the receive loop is running.
    Receiving,
    /// Gave up on the slot (terminal).
    Abandoned,
}

/// How an agent task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentExit {
    /// The session failed and the policy forbids reconnecting.
    Abandoned,
    /// The runtime token was cancelled.
    Cancelled,
}

/// Per-agent policies, taken from [`Config`].
#[derive(Clone, Debug)]
pub struct AgentParams {
    pub reconnect: ReconnectPolicy,
    pub backoff: BackoffPolicy,
    /// Per-candidate connect timeout (`None` = OS default).
    pub connect_timeout: Option<Duration>,
    pub framing: Framing,
    pub max_read_len: usize,
}

impl From<&Config> for AgentParams {
    fn from(cfg: &Config) -> Self {
        Self {
            reconnect: cfg.reconnect,
            backoff: cfg.backoff,
            connect_timeout: cfg.connect_timeout(),
            framing: cfg.framing,
            max_read_len: cfg.max_read_len,
        }
    }
}

/// Collaborators shared by every agent of a station.
#[derive(Clone)]
pub struct AgentDeps {
    pub resolver: Arc<dyn Resolve>,
    pub connector: Arc<dyn Connect>,
    pub trigger: DisplayTrigger,
    pub bus: Bus,
}

/// Drives one sensor slot from resolution to reception.
pub struct ConnectionAgent {
    endpoint: SensorEndpoint,
    label: Arc<str>,
    slot: SlotHandle,
    params: AgentParams,
    deps: AgentDeps,
    state: watch::Sender<AgentState>,
}

impl ConnectionAgent {
    pub fn new(
        endpoint: SensorEndpoint,
        slot: SlotHandle,
        params: AgentParams,
        deps: AgentDeps,
    ) -> Self {
        let label: Arc<str> = endpoint.to_string().into();
        let (state, _) = watch::channel(AgentState::Idle);
        Self {
            endpoint,
            label,
            slot,
            params,
            deps,
            state,
        }
    }

    /// Slot index served by this agent.
    pub fn index(&self) -> usize {
        self.slot.index()
    }

    /// Returns a receiver following the agent's state.
    pub fn watch_state(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    /// Runs sessions until the slot is abandoned or `token` is cancelled.
    pub async fn run(self, token: CancellationToken) -> AgentExit {
        let mut failures: u32 = 0;
        let mut session: u32 = 0;

        let exit = loop {
            if token.is_cancelled() {
                break AgentExit::Cancelled;
            }
            session = session.saturating_add(1);

            let established = tokio::select! {
                _ = token.cancelled() => break AgentExit::Cancelled,
                res = self.establish(session) => res,
            };

            let err = match established {
                Ok(stream) => {
                    failures = 0;
                    match self.receive(stream, &token).await {
                        Some(err) => err,
                        None => break AgentExit::Cancelled,
                    }
                }
                Err(err) => err,
            };

            self.deps.bus.publish(
                self.event(EventKind::SessionFailed)
                    .with_endpoint(self.label.clone())
                    .with_attempt(session)
                    .with_error(&err),
            );

            if !self.params.reconnect.retries() {
                self.state.send_replace(AgentState::Abandoned);
                self.deps.bus.publish(
                    self.event(EventKind::SensorAbandoned)
                        .with_endpoint(self.label.clone())
                        .with_reason(err.to_string()),
                );
                break AgentExit::Abandoned;
            }

            let delay = self.params.backoff.next(failures);
            failures = failures.saturating_add(1);
            self.deps.bus.publish(
                self.event(EventKind::ReconnectScheduled)
                    .with_endpoint(self.label.clone())
                    .with_delay(delay)
                    .with_attempt(session),
            );

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => break AgentExit::Cancelled,
            }
        };

        if exit == AgentExit::Cancelled {
            self.state.send_replace(AgentState::Idle);
        }
        exit
    }

    /// Resolves the endpoint and connects to the first candidate that accepts.
    async fn establish(&self, session: u32) -> Result<Box<dyn SensorStream>, SensorError> {
        self.state.send_replace(AgentState::Resolving);
        self.deps.bus.publish(
            self.event(EventKind::SensorResolving)
                .with_endpoint(self.label.clone())
                .with_attempt(session),
        );

        let candidates = self.deps.resolver.resolve(&self.endpoint).await?;
        if candidates.is_empty() {
            return Err(SensorError::NoCandidates {
                endpoint: self.label.to_string(),
            });
        }

        for (i, addr) in candidates.iter().copied().enumerate() {
            self.state.send_replace(AgentState::Connecting { candidate: i });
            self.deps.bus.publish(
                self.event(EventKind::SensorConnecting)
                    .with_addr(addr)
                    .with_attempt(i as u32 + 1),
            );

            match self.connect_one(addr).await {
                Ok(stream) => {
                    self.state.send_replace(AgentState::Receiving);
                    self.deps.bus.publish(
                        self.event(EventKind::SensorConnected)
                            .with_endpoint(self.label.clone())
                            .with_addr(addr),
                    );
                    return Ok(stream);
                }
                Err(err) => {
                    self.deps.bus.publish(
                        self.event(EventKind::ConnectFailed)
                            .with_addr(addr)
                            .with_error(&err),
                    );
                }
            }
        }

        Err(SensorError::Exhausted {
            endpoint: self.label.to_string(),
            tried: candidates.len(),
        })
    }

    async fn connect_one(&self, addr: SocketAddr) -> Result<Box<dyn SensorStream>, SensorError> {
        let attempt = self.deps.connector.connect(addr);
        let res = match self.params.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    return Err(SensorError::Connect {
                        addr,
                        reason: format!("timed out after {limit:?}"),
                    });
                }
            },
            None => attempt.await,
        };
        res.map_err(|e| SensorError::Connect {
            addr,
            reason: e.to_string(),
        })
    }

    /// Receive loop. Returns the error that ended the session, or `None` on cancellation.
    async fn receive(
        &self,
        mut stream: Box<dyn SensorStream>,
        token: &CancellationToken,
    ) -> Option<SensorError> {
        let mut buf = vec![0u8; self.params.max_read_len.max(1)];
        let mut decoder = FrameDecoder::new(self.params.framing, self.params.max_read_len);
        let mut errors: u32 = 0;

        loop {
            let read = tokio::select! {
                _ = token.cancelled() => return None,
                res = stream.read(&mut buf) => res,
            };

            let err = match read {
                Ok(0) => SensorError::Closed,
                Ok(n) => {
                    errors = 0;
                    self.ingest(&mut decoder, &buf[..n]);
                    continue;
                }
                Err(source) => SensorError::Read { source },
            };

            decoder.reset();
            if self.params.reconnect.retries() {
                return Some(err);
            }

            // Same socket, paced so a dead peer does not spin.
            let pause = self.params.backoff.next(errors);
            errors = errors.saturating_add(1);
            self.deps.bus.publish(
                self.event(EventKind::ReadFailed)
                    .with_endpoint(self.label.clone())
                    .with_delay(pause)
                    .with_error(&err),
            );

            let sleep = tokio::time::sleep(pause);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => return None,
            }
        }
    }

    fn ingest(&self, decoder: &mut FrameDecoder, chunk: &[u8]) {
        let mut stored = false;
        for res in decoder.decode(chunk) {
            match res {
                Ok(value) => {
                    self.slot.record(value, Instant::now());
                    self.deps
                        .bus
                        .publish(self.event(EventKind::ReadingStored).with_value(value));
                    stored = true;
                }
                Err(err) => {
                    self.deps
                        .bus
                        .publish(self.event(EventKind::ReadingRejected).with_error(&err));
                }
            }
        }
        if stored {
            self.deps.trigger.notify();
        }
    }

    #[inline]
    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_sensor(self.slot.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::JitterPolicy;
    use crate::sensors::ReadingStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio::sync::broadcast;

    struct StaticResolver(Vec<SocketAddr>);

    #[async_trait]
    impl Resolve for StaticResolver {
        async fn resolve(&self, _: &SensorEndpoint) -> Result<Vec<SocketAddr>, SensorError> {
            Ok(self.0.clone())
        }
    }

    /// Hands out queued outcomes in order, then refuses.
    #[derive(Default)]
    struct ScriptedConnector {
        script: Mutex<VecDeque<io::Result<DuplexStream>>>,
        calls: Mutex<Vec<SocketAddr>>,
    }

    impl ScriptedConnector {
        fn push_ok(&self, stream: DuplexStream) {
            self.script.lock().unwrap().push_back(Ok(stream));
        }

        fn push_refused(&self) {
            self.script
                .lock()
                .unwrap()
                .push_back(Err(io::ErrorKind::ConnectionRefused.into()));
        }
    }

    #[async_trait]
    impl Connect for ScriptedConnector {
        async fn connect(&self, addr: SocketAddr) -> io::Result<Box<dyn SensorStream>> {
            self.calls.lock().unwrap().push(addr);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(stream)) => Ok(Box::new(stream)),
                Some(Err(e)) => Err(e),
                None => Err(io::ErrorKind::ConnectionRefused.into()),
            }
        }
    }

    fn addrs(n: u16) -> Vec<SocketAddr> {
        (0..n)
            .map(|i| SocketAddr::from(([127, 0, 0, 1], 6000 + i)))
            .collect()
    }

    fn params(reconnect: ReconnectPolicy, framing: Framing) -> AgentParams {
        AgentParams {
            reconnect,
            backoff: BackoffPolicy {
                first: Duration::from_millis(100),
                max: Duration::from_secs(1),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
            connect_timeout: None,
            framing,
            max_read_len: 64,
        }
    }

    struct Rig {
        store: Arc<ReadingStore>,
        connector: Arc<ScriptedConnector>,
        bus: Bus,
    }

    fn agent(rig: &Rig, candidates: u16, params: AgentParams) -> ConnectionAgent {
        ConnectionAgent::new(
            SensorEndpoint::new("sensor.local", 6000),
            rig.store.slot(0).unwrap(),
            params,
            AgentDeps {
                resolver: Arc::new(StaticResolver(addrs(candidates))),
                connector: rig.connector.clone(),
                trigger: DisplayTrigger::new(),
                bus: rig.bus.clone(),
            },
        )
    }

    fn rig() -> Rig {
        Rig {
            store: ReadingStore::new(1),
            connector: Arc::new(ScriptedConnector::default()),
            bus: Bus::new(256),
        }
    }

    async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == kind {
                return ev;
            }
        }
    }

    #[tokio::test]
    async fn falls_back_to_next_candidate_and_stores_readings() {
        let rig = rig();
        let (client, mut server) = tokio::io::duplex(64);
        rig.connector.push_refused();
        rig.connector.push_ok(client);

        let mut rx = rig.bus.subscribe();
        let agent = agent(&rig, 2, params(ReconnectPolicy::Never, Framing::PerRead));
        let state = agent.watch_state();
        let token = CancellationToken::new();
        let task = tokio::spawn(agent.run(token.clone()));

        let connected = wait_for(&mut rx, EventKind::SensorConnected).await;
        assert_eq!(connected.addr, Some(addrs(2)[1]));
        assert_eq!(*state.borrow(), AgentState::Receiving);

        server.write_all(b"23.456789\n").await.unwrap();
        let stored = wait_for(&mut rx, EventKind::ReadingStored).await;
        assert_eq!(stored.value, Some(23.456789));
        assert_eq!(rig.store.get(0).map(|r| r.value), Some(23.456789));

        token.cancel();
        assert_eq!(task.await.unwrap(), AgentExit::Cancelled);
        assert_eq!(rig.connector.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_candidates_abandon_slot_by_default() {
        let rig = rig();
        let mut rx = rig.bus.subscribe();
        let agent = agent(&rig, 3, params(ReconnectPolicy::Never, Framing::PerRead));
        let state = agent.watch_state();

        let exit = agent.run(CancellationToken::new()).await;
        assert_eq!(exit, AgentExit::Abandoned);
        assert_eq!(*state.borrow(), AgentState::Abandoned);
        assert_eq!(rig.store.get(0), None);

        let mut failed = 0;
        loop {
            let ev = rx.recv().await.unwrap();
            match ev.kind {
                EventKind::ConnectFailed => failed += 1,
                EventKind::SessionFailed => assert_eq!(ev.label, Some("sensor_exhausted")),
                EventKind::SensorAbandoned => break,
                _ => {}
            }
        }
        assert_eq!(failed, 3);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_a_session_failure() {
        let rig = rig();
        let mut rx = rig.bus.subscribe();
        let agent = agent(&rig, 0, params(ReconnectPolicy::Never, Framing::PerRead));

        assert_eq!(agent.run(CancellationToken::new()).await, AgentExit::Abandoned);
        let failed = wait_for(&mut rx, EventKind::SessionFailed).await;
        assert_eq!(failed.label, Some("sensor_no_candidates"));
        assert!(rig.connector.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parse_failure_keeps_previous_value() {
        let rig = rig();
        let (client, mut server) = tokio::io::duplex(64);
        rig.connector.push_ok(client);

        let mut rx = rig.bus.subscribe();
        let token = CancellationToken::new();
        let task = tokio::spawn(
            agent(&rig, 1, params(ReconnectPolicy::Never, Framing::PerRead)).run(token.clone()),
        );

        server.write_all(b"21.0").await.unwrap();
        wait_for(&mut rx, EventKind::ReadingStored).await;
        server.write_all(b"warm").await.unwrap();
        let rejected = wait_for(&mut rx, EventKind::ReadingRejected).await;
        assert_eq!(rejected.label, Some("sensor_parse"));
        assert_eq!(rig.store.get(0).map(|r| r.value), Some(21.0));

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn line_framing_applies_every_reading_in_order() {
        let rig = rig();
        let (client, mut server) = tokio::io::duplex(64);
        rig.connector.push_ok(client);

        let mut rx = rig.bus.subscribe();
        let token = CancellationToken::new();
        let task = tokio::spawn(
            agent(&rig, 1, params(ReconnectPolicy::Never, Framing::Lines)).run(token.clone()),
        );

        server.write_all(b"1.5\n2.5\n3.").await.unwrap();
        let first = wait_for(&mut rx, EventKind::ReadingStored).await;
        let second = wait_for(&mut rx, EventKind::ReadingStored).await;
        assert_eq!((first.value, second.value), (Some(1.5), Some(2.5)));

        server.write_all(b"5\n").await.unwrap();
        let third = wait_for(&mut rx, EventKind::ReadingStored).await;
        assert_eq!(third.value, Some(3.5));
        assert_eq!(rig.store.get(0).map(|r| r.value), Some(3.5));

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn peer_close_is_logged_and_read_rearmed_without_reconnect() {
        let rig = rig();
        let (client, server) = tokio::io::duplex(64);
        rig.connector.push_ok(client);

        let mut rx = rig.bus.subscribe();
        let agent = agent(&rig, 1, params(ReconnectPolicy::Never, Framing::PerRead));
        let state = agent.watch_state();
        let token = CancellationToken::new();
        let task = tokio::spawn(agent.run(token.clone()));

        wait_for(&mut rx, EventKind::SensorConnected).await;
        drop(server);

        let first = wait_for(&mut rx, EventKind::ReadFailed).await;
        assert_eq!(first.label, Some("sensor_closed"));
        assert_eq!(first.delay_ms, Some(100));
        let second = wait_for(&mut rx, EventKind::ReadFailed).await;
        assert_eq!(second.delay_ms, Some(200));

        assert_eq!(*state.borrow(), AgentState::Receiving);
        assert_eq!(rig.connector.calls.lock().unwrap().len(), 1);

        token.cancel();
        assert_eq!(task.await.unwrap(), AgentExit::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn on_failure_reconnects_after_peer_close() {
        let rig = rig();
        let (first, first_server) = tokio::io::duplex(64);
        let (second, mut second_server) = tokio::io::duplex(64);
        rig.connector.push_ok(first);
        rig.connector.push_ok(second);

        let mut rx = rig.bus.subscribe();
        let token = CancellationToken::new();
        let task = tokio::spawn(
            agent(&rig, 1, params(ReconnectPolicy::OnFailure, Framing::PerRead))
                .run(token.clone()),
        );

        wait_for(&mut rx, EventKind::SensorConnected).await;
        drop(first_server);

        let failed = wait_for(&mut rx, EventKind::SessionFailed).await;
        assert_eq!(failed.label, Some("sensor_closed"));
        let scheduled = wait_for(&mut rx, EventKind::ReconnectScheduled).await;
        assert_eq!(scheduled.delay_ms, Some(100));

        wait_for(&mut rx, EventKind::SensorConnected).await;
        second_server.write_all(b"-4.0").await.unwrap();
        wait_for(&mut rx, EventKind::ReadingStored).await;
        assert_eq!(rig.store.get(0).map(|r| r.value), Some(-4.0));

        token.cancel();
        assert_eq!(task.await.unwrap(), AgentExit::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let rig = rig();
        let mut rx = rig.bus.subscribe();
        let token = CancellationToken::new();
        let task = tokio::spawn(
            agent(&rig, 1, params(ReconnectPolicy::OnFailure, Framing::PerRead))
                .run(token.clone()),
        );

        wait_for(&mut rx, EventKind::ReconnectScheduled).await;
        token.cancel();
        assert_eq!(task.await.unwrap(), AgentExit::Cancelled);
    }
}
