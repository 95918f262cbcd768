//! # thermovisor
//!
//! Displays the mean temperature reported by a fixed set of TCP sensor nodes.
//!
//! ## Usage
//!
//! ```bash
//! # Four sensors on 127.0.0.1:5000..5003, one readout per second
//! thermovisor
//!
//! # Eight sensors on another host, reconnecting after failures
//! thermovisor --host sensors.lan --sensors 8 --reconnect on-failure
//! ```
//!
//! Readouts go to stdout, logs to stderr (`RUST_LOG` overrides `--log-level`).

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use thermovisor::{
    BackoffPolicy, Config, Framing, JitterPolicy, LogWriter, ReconnectPolicy, Station, Subscribe,
};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Real-time temperature aggregator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of sensor nodes
    #[arg(short = 'n', long = "sensors", default_value = "4")]
    sensor_count: usize,

    /// Host every sensor node listens on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port of sensor 0; sensor i uses base-port + i
    #[arg(short = 'p', long, default_value = "5000")]
    base_port: u16,

    /// Minimum time between two readouts, in milliseconds
    #[arg(long, default_value = "1000")]
    min_interval_ms: u64,

    /// Readings at least this old are ignored, in seconds
    #[arg(long, default_value = "600")]
    staleness_secs: u64,

    /// Size of one read (and longest accepted line), in bytes
    #[arg(long, default_value_t = thermovisor::DEFAULT_MAX_READ_LEN)]
    max_read_len: usize,

    /// How received bytes map to readings (per-read, lines)
    #[arg(long, default_value = "per-read")]
    framing: Framing,

    /// What to do after a failed session (never, on-failure)
    #[arg(long, default_value = "never")]
    reconnect: ReconnectPolicy,

    /// First reconnect delay, in milliseconds
    #[arg(long, default_value = "1000")]
    backoff_first_ms: u64,

    /// Largest reconnect delay, in milliseconds
    #[arg(long, default_value = "60000")]
    backoff_max_ms: u64,

    /// Growth factor between consecutive reconnect delays
    #[arg(long, default_value = "2.0")]
    backoff_factor: f64,

    /// Jitter applied to reconnect delays (none, full, equal, decorrelated)
    #[arg(long, default_value = "none")]
    jitter: JitterPolicy,

    /// Per-address connect timeout in milliseconds (0 = none)
    #[arg(long, default_value = "0")]
    connect_timeout_ms: u64,

    /// Also try IPv6 addresses of the sensor host
    #[arg(long)]
    allow_ipv6: bool,

    /// Runtime worker threads (1 = single-threaded)
    #[arg(short, long, default_value = "1")]
    workers: usize,

    /// Maximum wait for sensor agents on shutdown, in seconds (0 = don't wait)
    #[arg(long, default_value = "5")]
    grace_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            sensor_count: self.sensor_count,
            host: self.host.clone(),
            base_port: self.base_port,
            min_display_interval: Duration::from_millis(self.min_interval_ms),
            staleness_window: Duration::from_secs(self.staleness_secs),
            max_read_len: self.max_read_len,
            framing: self.framing,
            reconnect: self.reconnect,
            backoff: BackoffPolicy {
                first: Duration::from_millis(self.backoff_first_ms),
                max: Duration::from_millis(self.backoff_max_ms),
                factor: self.backoff_factor,
                jitter: self.jitter,
            },
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ipv4_only: !self.allow_ipv6,
            worker_threads: self.workers,
            grace: Duration::from_secs(self.grace_secs),
            ..Config::default()
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Name of the runtime worker threads, as shown by `top -H` and debuggers.
const WORKER_THREAD_NAME: &str = "thermovisor-dispatcher";

fn build_runtime(workers: usize) -> std::io::Result<tokio::runtime::Runtime> {
    if workers <= 1 {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name(WORKER_THREAD_NAME)
            .enable_all()
            .build()
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let cfg = args.config();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        sensors = cfg.sensor_count,
        host = %cfg.host,
        base_port = cfg.base_port,
        reconnect = ?cfg.reconnect,
        framing = ?cfg.framing,
        "thermovisor starting"
    );

    let workers = cfg.worker_threads;
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let station = match Station::builder(cfg).with_subscribers(subs).build() {
        Ok(station) => station,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let runtime = match build_runtime(workers) {
        Ok(rt) => rt,
        Err(err) => {
            error!(%err, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(station.run()) {
        Ok(()) => {
            info!("thermovisor stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(label = err.as_label(), %err, "shutdown incomplete");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_workers_carry_dispatcher_name() {
        let rt = build_runtime(2).unwrap();
        let name = rt
            .block_on(rt.spawn(async {
                std::thread::current().name().map(str::to_owned)
            }))
            .unwrap();
        assert_eq!(name.as_deref(), Some(WORKER_THREAD_NAME));
    }

    #[test]
    fn single_worker_uses_current_thread() {
        let rt = build_runtime(1).unwrap();
        assert_eq!(
            rt.handle().runtime_flavor(),
            tokio::runtime::RuntimeFlavor::CurrentThread
        );
    }
}
