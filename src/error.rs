//! Error types used by the thermovisor runtime and its sensor agents.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`] errors raised by the orchestration runtime itself.
//! - [`SensorError`] failures local to one sensor slot (resolve, connect, read, parse).
//! - [`ConfigError`] invalid startup configuration (the only fatal class).
//!
//! All types provide `as_label` for logs.

use std::{net::SocketAddr, time::Duration};
use thiserror::Error;

/// # Errors produced by the thermovisor runtime.
///
/// These represent failures in the orchestration itself,
/// such as a shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some agents remained stuck and were abandoned.
    #[error("shutdown timeout {grace:?} exceeded; still linked: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Sensors that still held a live connection when the grace ran out.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use thermovisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Failures local to a single sensor slot.
///
/// None of these are fatal to the process or to other slots.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SensorError {
    /// Name resolution itself failed.
    #[error("could not resolve {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Resolution succeeded but yielded no usable address.
    #[error("no candidate address for {endpoint}")]
    NoCandidates { endpoint: String },

    /// One candidate address refused, timed out or was unreachable.
    #[error("connect to {addr} failed: {reason}")]
    Connect { addr: SocketAddr, reason: String },

    /// Every candidate address failed.
    #[error("exhausted {tried} candidate address(es) for {endpoint}")]
    Exhausted { endpoint: String, tried: usize },

    /// The read itself failed (reset, broken pipe, ...).
    #[error("read failed: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the connection (zero-byte read).
    #[error("connection closed by peer")]
    Closed,

    /// Payload was not a finite decimal number.
    #[error("invalid reading {payload:?}: {reason}")]
    Parse { payload: String, reason: String },
}

impl SensorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use thermovisor::SensorError;
    ///
    /// assert_eq!(SensorError::Closed.as_label(), "sensor_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SensorError::Resolve { .. } => "sensor_resolve",
            SensorError::NoCandidates { .. } => "sensor_no_candidates",
            SensorError::Connect { .. } => "sensor_connect",
            SensorError::Exhausted { .. } => "sensor_exhausted",
            SensorError::Read { .. } => "sensor_read",
            SensorError::Closed => "sensor_closed",
            SensorError::Parse { .. } => "sensor_parse",
        }
    }
}

/// # Invalid startup configuration.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sensor_count must be at least 1")]
    NoSensors,

    #[error("port range {base}..{base}+{count} does not fit in u16")]
    PortRange { base: u16, count: usize },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}
