//! # Jitter applied to backoff delays.
//!
//! Spreads the reconnects of sensors that failed together.
//!
//! - [`JitterPolicy::None`] exact delay
//! - [`JitterPolicy::Full`] uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`] `delay/2 + uniform[0, delay/2]`
//! - [`JitterPolicy::Decorrelated`] uniform in `[first, min(3 × delay, max)]`

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the backoff delay as is.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Half fixed, half random.
    Equal,
    /// Uniform between the first delay and three times the current base.
    Decorrelated,
}

impl JitterPolicy {
    /// Applies the stateless strategies to `delay`.
    ///
    /// `Decorrelated` needs more context and returns `delay` unchanged here;
    /// [`BackoffPolicy::next`](crate::BackoffPolicy::next) routes it to
    /// [`JitterPolicy::decorrelated`].
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return delay;
        }
        let mut rng = rand::rng();
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full => Duration::from_millis(rng.random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rng.random_range(0..=ms - half))
            }
        }
    }

    /// Uniform in `[floor, min(3 × base, max)]`.
    pub fn decorrelated(floor: Duration, base: Duration, max: Duration) -> Duration {
        let floor_ms = floor.as_millis() as u64;
        let upper = (base.as_millis() as u64)
            .saturating_mul(3)
            .min(max.as_millis() as u64)
            .max(floor_ms);

        if floor_ms >= upper {
            return floor;
        }
        Duration::from_millis(rand::rng().random_range(floor_ms..=upper))
    }
}

impl std::str::FromStr for JitterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(JitterPolicy::None),
            "full" => Ok(JitterPolicy::Full),
            "equal" => Ok(JitterPolicy::Equal),
            "decorrelated" => Ok(JitterPolicy::Decorrelated),
            other => Err(format!(
                "unknown jitter {other:?} (none | full | equal | decorrelated)"
            )),
        }
    }
}
