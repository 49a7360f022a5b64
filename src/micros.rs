//! Microsecond quantities for scheduler arithmetic.

use core::ops::{Add, AddAssign, Sub};
use std::time::Duration;

/// Signed microseconds. The scheduler's wall-clock offset can go negative
/// after a tempo change.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Micros(i64);

impl Micros {
    /// No time
    pub const ZERO: Self = Self(0);

    /// Wrap a signed count
    pub const fn new(us: i64) -> Self {
        Self(us)
    }

    /// The count
    pub const fn us(&self) -> i64 {
        self.0
    }

    /// `self * num / den` through a 128-bit intermediate, rounded toward
    /// negative infinity. `den` must not be zero.
    pub fn mul_div(self, num: i64, den: i64) -> Self {
        let scaled = (i128::from(self.0) * i128::from(num)).div_euclid(i128::from(den));
        Self(i64::try_from(scaled).unwrap_or(if scaled < 0 { i64::MIN } else { i64::MAX }))
    }
}

/// Unsigned microseconds, as read from a stopwatch.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UMicros(u64);

impl UMicros {
    /// No time
    pub const ZERO: Self = Self(0);

    /// Wrap an unsigned count
    pub const fn new(us: u64) -> Self {
        Self(us)
    }

    /// The count
    pub const fn us(&self) -> u64 {
        self.0
    }

    /// From milliseconds
    pub const fn from_ms(ms: u64) -> Self {
        Self(ms * 1_000)
    }

    fn signed(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl From<Duration> for UMicros {
    fn from(value: Duration) -> Self {
        Self(u64::try_from(value.as_micros()).unwrap_or(u64::MAX))
    }
}

impl From<UMicros> for Duration {
    fn from(value: UMicros) -> Self {
        Duration::from_micros(value.0)
    }
}

impl AddAssign for UMicros {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

/// Logical time: stopwatch reading plus offset.
impl Add<Micros> for UMicros {
    type Output = Micros;
    fn add(self, rhs: Micros) -> Micros {
        Micros(self.signed().saturating_add(rhs.0))
    }
}

/// The offset that makes a logical time line up with a stopwatch reading.
impl Sub<UMicros> for Micros {
    type Output = Micros;
    fn sub(self, rhs: UMicros) -> Micros {
        Micros(self.0.saturating_sub(rhs.signed()))
    }
}
