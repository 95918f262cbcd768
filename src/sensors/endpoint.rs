use std::fmt;

/// Connection target of one sensor slot. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SensorEndpoint {
    pub host: String,
    pub port: u16,
}

impl SensorEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for SensorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
