//! # Connection establishment.
//!
//! [`Connect`] opens a byte stream to one candidate address. The agent only
//! reads from it, so any `AsyncRead` qualifies as a [`SensorStream`].

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use tokio::{io::AsyncRead, net::TcpStream};

/// Readable byte stream from a sensor.
pub trait SensorStream: AsyncRead + Send + Unpin + 'static {}

impl<T: AsyncRead + Send + Unpin + 'static> SensorStream for T {}

/// Opens a stream to one candidate address.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    async fn connect(&self, addr: SocketAddr) -> io::Result<Box<dyn SensorStream>>;
}

/// Plain TCP connector.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connect for TcpConnector {
    async fn connect(&self, addr: SocketAddr) -> io::Result<Box<dyn SensorStream>> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}
