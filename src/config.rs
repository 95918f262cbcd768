//! # Runtime configuration.
//!
//! [`Config`] centralizes every knob of the station: the fixed sensor set,
//! display pacing, staleness, wire framing and the reconnect policy.
//!
//! ## Sentinel values
//! - `connect_timeout = 0s` → no timeout beyond the OS connect timeout
//! - `grace = 0s` → do not wait for agents on shutdown

use std::time::Duration;

use crate::{
    error::ConfigError,
    policies::{BackoffPolicy, ReconnectPolicy},
    sensors::{Framing, SensorEndpoint},
};

/// Largest payload a single read may return.
pub const DEFAULT_MAX_READ_LEN: usize = 87_380;

/// Global configuration for a [`Station`](crate::Station).
///
/// ## Field semantics
/// - `sensor_count`: number of sensor slots, fixed for the process lifetime
/// - `host` / `base_port`: slot `i` connects to `host:(base_port + i)`
/// - `min_display_interval`: at most one rendered readout per interval
/// - `staleness_window`: readings at least this old are excluded from the mean
/// - `max_read_len`: buffer size of one read (and the longest accepted line)
/// - `worker_threads`: `1` runs everything on one thread; more enables a pool
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of sensor slots.
    pub sensor_count: usize,
    /// Host every sensor is reached on.
    pub host: String,
    /// Port of slot 0; slot `i` uses `base_port + i`.
    pub base_port: u16,
    /// Minimum time between two rendered readouts.
    pub min_display_interval: Duration,
    /// Maximum age a reading may have and still count.
    pub staleness_window: Duration,
    /// Size of the per-read buffer.
    pub max_read_len: usize,
    /// How received bytes are cut into readings.
    pub framing: Framing,
    /// What happens after a failed session.
    pub reconnect: ReconnectPolicy,
    /// Pacing of reconnects and of re-armed reads after errors.
    pub backoff: BackoffPolicy,
    /// Per-candidate connect timeout (`0s` = none).
    pub connect_timeout: Duration,
    /// Only try IPv4 candidates.
    pub ipv4_only: bool,
    /// Worker threads of the runtime.
    pub worker_threads: usize,
    /// Maximum wait for agents to stop on shutdown.
    pub grace: Duration,
    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the endpoints of all slots, in slot order.
    pub fn endpoints(&self) -> Vec<SensorEndpoint> {
        (0..self.sensor_count)
            .map(|i| SensorEndpoint::new(self.host.clone(), self.base_port.wrapping_add(i as u16)))
            .collect()
    }

    /// Returns the connect timeout as an `Option` (`0s` → `None`).
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        if self.connect_timeout.is_zero() {
            None
        } else {
            Some(self.connect_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks the values a station cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_count == 0 {
            return Err(ConfigError::NoSensors);
        }
        let last = usize::from(self.base_port).checked_add(self.sensor_count - 1);
        if !matches!(last, Some(port) if port <= usize::from(u16::MAX)) {
            return Err(ConfigError::PortRange {
                base: self.base_port,
                count: self.sensor_count,
            });
        }
        if self.max_read_len == 0 {
            return Err(ConfigError::Zero { field: "max_read_len" });
        }
        if self.staleness_window.is_zero() {
            return Err(ConfigError::Zero { field: "staleness_window" });
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Zero { field: "worker_threads" });
        }
        Ok(())
    }
}

impl Default for Config {
    /// Four loopback sensors on ports 5000..5003, one readout per second,
    /// ten minute staleness, no reconnects, single worker thread.
    fn default() -> Self {
        Self {
            sensor_count: 4,
            host: "127.0.0.1".to_string(),
            base_port: 5000,
            min_display_interval: Duration::from_secs(1),
            staleness_window: Duration::from_secs(10 * 60),
            max_read_len: DEFAULT_MAX_READ_LEN,
            framing: Framing::default(),
            reconnect: ReconnectPolicy::default(),
            backoff: BackoffPolicy::default(),
            connect_timeout: Duration::ZERO,
            ipv4_only: true,
            worker_threads: 1,
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_follow_base_port() {
        let cfg = Config::default();
        let ports: Vec<u16> = cfg.endpoints().iter().map(|e| e.port).collect();
        assert_eq!(ports, vec![5000, 5001, 5002, 5003]);
        assert!(cfg.endpoints().iter().all(|e| e.host == "127.0.0.1"));
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn zero_connect_timeout_means_none() {
        let mut cfg = Config::default();
        assert_eq!(cfg.connect_timeout(), None);
        cfg.connect_timeout = Duration::from_millis(750);
        assert_eq!(cfg.connect_timeout(), Some(Duration::from_millis(750)));
    }

    #[test]
    fn rejects_unusable_values() {
        let cfg = Config {
            sensor_count: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoSensors));

        let cfg = Config {
            base_port: 65_535,
            sensor_count: 2,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::PortRange { .. })));

        let cfg = Config {
            base_port: 0,
            sensor_count: 65_536,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Ok(()));

        let cfg = Config {
            max_read_len: 0,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Zero { field: "max_read_len" })
        );
    }

    #[test]
    fn huge_sensor_counts_are_out_of_port_range() {
        for count in [65_537, usize::MAX, u32::MAX as usize, 1usize << 32] {
            let cfg = Config {
                base_port: 0,
                sensor_count: count,
                ..Config::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::PortRange { .. })),
                "count {count}"
            );
        }
    }
}
