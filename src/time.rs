//! Simulated time.
//!
//! A scalar with no relation to `std::time`. Time advances only when the
//! engine dispatches events. Values are `f64` so models can use natural
//! units, but NaN is rejected at construction, which gives `SimTime` a
//! total order and lets it key the event queue.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// A point in simulated time. Never NaN.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Sentinel for "no pending event".
    pub const INFINITY: SimTime = SimTime(f64::INFINITY);

    /// Create a time, rejecting NaN.
    pub fn new(value: f64) -> SimResult<Self> {
        if value.is_nan() {
            return Err(SimError::InvalidTime("time is NaN".into()));
        }
        Ok(Self::from_raw(value))
    }

    /// Wrap a value already known not to be NaN.
    #[inline]
    pub(crate) fn from_raw(value: f64) -> Self {
        debug_assert!(!value.is_nan());
        // -0.0 and 0.0 must compare and hash equal.
        if value == 0.0 {
            SimTime(0.0)
        } else {
            SimTime(value)
        }
    }

    /// Return the raw value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` unless this is the infinity sentinel.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// The time `delay` after `self`.
    ///
    /// Fails with `InvalidTime` if `delay` is NaN or negative.
    pub fn plus(self, delay: f64) -> SimResult<SimTime> {
        if delay.is_nan() {
            return Err(SimError::InvalidTime("delay is NaN".into()));
        }
        if delay < 0.0 {
            return Err(SimError::InvalidTime(format!("delay < 0: {}", delay)));
        }
        SimTime::new(self.0 + delay)
    }

    /// The time of tick number `count` of a clock with the given period.
    ///
    /// Computed as a product rather than a running sum so that long runs do
    /// not accumulate rounding error.
    pub fn of_period(count: u64, period: f64) -> SimResult<SimTime> {
        SimTime::new(count as f64 * period)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for SimTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::ZERO
    }
}

impl TryFrom<f64> for SimTime {
    type Error = SimError;

    fn try_from(value: f64) -> SimResult<Self> {
        SimTime::new(value)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> f64 {
        time.0
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
