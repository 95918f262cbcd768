//! Sensor-side building blocks: endpoints, resolution, connections,
//! wire framing and the shared reading table.
//!
//! ## Contents
//! - [`SensorEndpoint`] fixed host/port of one slot
//! - [`Resolve`] / [`SystemResolver`] endpoint → ordered candidate addresses
//! - [`Connect`] / [`TcpConnector`] candidate address → readable stream
//! - [`Framing`] / [`FrameDecoder`] bytes → readings
//! - [`ReadingStore`] / [`SlotHandle`] last reading per slot, staleness and mean

mod connector;
mod endpoint;
mod framing;
mod resolver;
mod store;

pub use connector::{Connect, SensorStream, TcpConnector};
pub use endpoint::SensorEndpoint;
pub use framing::{FrameDecoder, Framing, parse_reading};
pub use resolver::{Resolve, SystemResolver};
pub use store::{Reading, ReadingStore, SlotHandle, Summary};
