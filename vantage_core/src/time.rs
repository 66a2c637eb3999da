// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time in microsecond ticks.
//!
//! Browsers report time as a [`DOMHighResTimeStamp`][mdn]: fractional
//! milliseconds since the time origin. [`HostTime`] stores the same instant
//! as whole microseconds so comparisons and throttling arithmetic stay in
//! integers. [`Duration`] uses the same unit.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use core::fmt;
use core::ops::{Add, Sub};

/// Microseconds per millisecond.
const MICROS_PER_MILLI: f64 = 1000.0;

/// A point in time expressed as microseconds since the host's time origin.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Converts a `DOMHighResTimeStamp` (milliseconds) to a [`HostTime`].
    ///
    /// Negative and non-finite inputs clamp to zero.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "timestamps are small positive f64; µs fits in u64 and negatives are clamped"
    )]
    pub fn from_millis_f64(ms: f64) -> Self {
        if !ms.is_finite() || ms <= 0.0 {
            return Self(0);
        }
        Self((ms * MICROS_PER_MILLI) as u64)
    }

    /// Returns this time as fractional milliseconds.
    #[inline]
    #[must_use]
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_MILLI
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// A duration in microsecond ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1000)
    }

    /// Returns the duration of one frame at `fps` frames per second.
    ///
    /// An `fps` of zero is treated as one.
    #[inline]
    #[must_use]
    pub const fn frame_interval(fps: u32) -> Self {
        let fps = if fps == 0 { 1 } else { fps as u64 };
        Self(1_000_000 / fps)
    }

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns this duration as fractional milliseconds.
    #[inline]
    #[must_use]
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_MILLI
    }

    /// Returns this duration rounded up to whole milliseconds, saturating at
    /// `u32::MAX`.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value is clamped to u32::MAX before the cast"
    )]
    pub const fn as_millis_ceil_u32(self) -> u32 {
        let ms = self.0.div_ceil(1000);
        if ms > u32::MAX as u64 {
            u32::MAX
        } else {
            ms as u32
        }
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}µs)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_convert_to_micro_ticks() {
        assert_eq!(HostTime::from_millis_f64(16.5), HostTime(16_500));
        assert_eq!(HostTime(33_250).as_millis_f64(), 33.25);
    }

    #[test]
    fn bogus_timestamps_clamp_to_zero() {
        assert_eq!(HostTime::from_millis_f64(-4.0), HostTime(0));
        assert_eq!(HostTime::from_millis_f64(f64::NAN), HostTime(0));
        assert_eq!(HostTime::from_millis_f64(f64::INFINITY), HostTime(0));
    }

    #[test]
    fn frame_intervals() {
        assert_eq!(Duration::frame_interval(60), Duration(16_666));
        assert_eq!(Duration::frame_interval(15), Duration(66_666));
        assert_eq!(Duration::frame_interval(0), Duration(1_000_000));
    }

    #[test]
    fn millis_ceil_rounds_up() {
        assert_eq!(Duration(1).as_millis_ceil_u32(), 1);
        assert_eq!(Duration::from_millis(300).as_millis_ceil_u32(), 300);
        assert_eq!(Duration(u64::MAX).as_millis_ceil_u32(), u32::MAX);
    }

    #[test]
    fn host_time_duration_ops() {
        let t = HostTime(1000);
        let d = Duration(200);
        assert_eq!((t + d).ticks(), 1200);
        assert_eq!((t - d).ticks(), 800);
        assert_eq!(t.saturating_duration_since(HostTime(1500)), Duration::ZERO);
        assert_eq!(t.saturating_duration_since(HostTime(400)), Duration(600));
        assert_eq!(HostTime(u64::MAX).checked_add(Duration(1)), None);
    }
}
