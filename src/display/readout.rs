use std::fmt;

/// Value shown on the display.
///
/// ```
/// use thermovisor::Readout;
///
/// assert_eq!(Readout::NoData.to_string(), "--.- °C");
/// assert_eq!(Readout::Celsius(21.349).to_string(), "21.3 °C");
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Readout {
    /// No fresh reading from any sensor.
    NoData,
    /// Mean of the fresh readings, in degrees Celsius.
    Celsius(f64),
}

impl Readout {
    /// `Celsius(mean)` or `NoData` when there is no mean.
    pub fn from_mean(mean: Option<f64>) -> Self {
        match mean {
            Some(v) if v.is_finite() => Readout::Celsius(v),
            _ => Readout::NoData,
        }
    }

    /// The displayed value, if any.
    pub fn celsius(&self) -> Option<f64> {
        match self {
            Readout::NoData => None,
            Readout::Celsius(v) => Some(*v),
        }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readout::NoData => f.write_str("--.- °C"),
            Readout::Celsius(v) => write!(f, "{v:.1} °C"),
        }
    }
}
