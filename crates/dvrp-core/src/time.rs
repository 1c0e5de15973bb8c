//! Simulation time model.
//!
//! # Design
//!
//! Time is a non-negative rational quantity; instants and durations share the
//! same type, so `travel_time` results and visit timestamps add without
//! conversion.  The inner representation is `f64` with a *total* order
//! (`f64::total_cmp`), which lets `SimTime` serve as a `BinaryHeap` /
//! `BTreeMap` key.  Non-finite values are rejected at the API boundary
//! ([`SimTime::new`]); arithmetic on values built from the checked
//! constructors stays finite.
//!
//! Two events at the same instant are *not* ordered by this type — the event
//! queue breaks ties with a FIFO sequence number.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Sub};

use crate::error::ConfigError;

/// An instant on (or a span of) the simulation clock.
#[derive(Copy, Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Checked constructor for an instant: rejects NaN and infinities.
    pub fn new(value: f64) -> Result<SimTime, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteTime(value));
        }
        Ok(SimTime(value))
    }

    /// Checked constructor for a duration: additionally rejects negatives.
    pub fn duration(value: f64) -> Result<SimTime, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteTime(value));
        }
        if value < 0.0 {
            return Err(ConfigError::NegativeDuration(value));
        }
        Ok(SimTime(value))
    }

    /// The raw clock value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` for a zero-length span.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Time elapsed from `earlier` to `self`, clamped to zero.
    #[inline]
    pub fn since(self, earlier: SimTime) -> SimTime {
        SimTime((self.0 - earlier.0).max(0.0))
    }
}

// Equality and ordering go through `total_cmp` so that `Eq`/`Ord` are lawful
// for any bit pattern that slips past the constructors.

impl PartialEq for SimTime {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for SimTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Add for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    #[inline]
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = SimTime;
    #[inline]
    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 - rhs.0)
    }
}

impl From<f64> for SimTime {
    /// Infallible conversion for literals.  Debug builds reject non-finite
    /// input; use [`SimTime::new`] for untrusted values.
    #[inline]
    fn from(value: f64) -> SimTime {
        debug_assert!(value.is_finite(), "non-finite SimTime literal: {value}");
        SimTime(value)
    }
}

impl From<i64> for SimTime {
    #[inline]
    fn from(value: i64) -> SimTime {
        SimTime(value as f64)
    }
}

impl From<i32> for SimTime {
    #[inline]
    fn from(value: i32) -> SimTime {
        SimTime(value as f64)
    }
}

impl From<u64> for SimTime {
    #[inline]
    fn from(value: u64) -> SimTime {
        SimTime(value as f64)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
