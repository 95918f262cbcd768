//! # sensor-node
//!
//! Simulated temperature sensor for manual testing of `thermovisor`.
//!
//! Listens on one port; every accepted connection receives a uniform random
//! reading in `[-50, 50)` °C, then waits either the full report period or a
//! random 1..period-1 seconds (an "appreciable change"), and repeats.
//!
//! ```bash
//! for p in 5000 5001 5002 5003; do sensor-node $p & done
//! thermovisor
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Simulated TCP temperature sensor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Seconds between periodic reports
    #[arg(long, default_value = "60")]
    period_secs: u64,

    /// Terminate every reading with a newline (for `--framing lines`)
    #[arg(long)]
    newline: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug)]
enum Mode {
    Periodic,
    RandomChange,
}

/// Next reading and the pause that follows it.
fn next_report(period: Duration) -> (f64, Mode, Duration) {
    let mut rng = rand::rng();
    let value = rng.random_range(-50.0..50.0);
    let period_secs = period.as_secs().max(2);

    if rng.random_bool(0.5) {
        (value, Mode::Periodic, Duration::from_secs(period_secs))
    } else {
        let secs = rng.random_range(1..period_secs);
        (value, Mode::RandomChange, Duration::from_secs(secs))
    }
}

async fn serve(mut stream: TcpStream, peer: SocketAddr, period: Duration, newline: bool) {
    loop {
        let (value, mode, pause) = next_report(period);
        let mut line = format!("{value:.6}");
        if newline {
            line.push('\n');
        }

        if let Err(err) = stream.write_all(line.as_bytes()).await {
            warn!(%peer, %err, "session ended");
            return;
        }
        debug!(%peer, value, ?mode, next_in = ?pause, "reading sent");
        tokio::time::sleep(pause).await;
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
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%addr, %err, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "sensor node listening");

    let period = Duration::from_secs(args.period_secs);
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!(%peer, "session established");
                    tokio::spawn(serve(stream, peer, period, args.newline));
                }
                Err(err) => warn!(%err, "accept failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("sensor node stopping");
                break;
            }
        }
    }
}
