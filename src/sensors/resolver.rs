//! # Endpoint resolution.
//!
//! [`Resolve`] turns a [`SensorEndpoint`] into the ordered list of candidate
//! addresses one connection attempt walks through. An empty list is an error
//! ([`SensorError::NoCandidates`]), never `Ok(vec![])`.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::{error::SensorError, sensors::SensorEndpoint};

/// Resolves a sensor endpoint to candidate addresses, in the order to try them.
#[async_trait]
pub trait Resolve: Send + Sync + 'static {
    async fn resolve(&self, endpoint: &SensorEndpoint) -> Result<Vec<SocketAddr>, SensorError>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Clone, Copy, Debug)]
pub struct SystemResolver {
    ipv4_only: bool,
}

impl SystemResolver {
    /// When `ipv4_only` is set, IPv6 results are dropped.
    pub fn new(ipv4_only: bool) -> Self {
        Self { ipv4_only }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, endpoint: &SensorEndpoint) -> Result<Vec<SocketAddr>, SensorError> {
        let addrs = tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|source| SensorError::Resolve {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let candidates: Vec<SocketAddr> = addrs
            .filter(|addr| !self.ipv4_only || addr.is_ipv4())
            .collect();

        if candidates.is_empty() {
            return Err(SensorError::NoCandidates {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_loopback_literal() {
        let endpoint = SensorEndpoint::new("127.0.0.1", 5000);
        let addrs = SystemResolver::default().resolve(&endpoint).await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:5000".parse::<SocketAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn ipv6_literal_has_no_ipv4_candidate() {
        let endpoint = SensorEndpoint::new("::1", 5000);
        let err = SystemResolver::new(true).resolve(&endpoint).await.unwrap_err();
        assert_eq!(err.as_label(), "sensor_no_candidates");

        let addrs = SystemResolver::new(false).resolve(&endpoint).await.unwrap();
        assert!(addrs.iter().all(SocketAddr::is_ipv6));
    }
}
