//! Monotonic clock abstraction.
//!
//! The estimator never reads wall-clock time directly: every duration it
//! reasons about comes from subtracting two [`Instant`]s produced by a
//! [`Clock`]. This keeps the core insulated from `SystemTime` jumps (NTP
//! steps, DST, user clock changes) and makes it deterministically testable
//! via [`MockClock`].

use std::ops::{Add, Sub};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// An opaque monotonic instant used throughout the estimator.
///
/// Backed by a nanosecond offset rather than `std::time::Instant` directly
/// so that [`MockClock`] can manufacture arbitrary instants without needing
/// to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(u64);

impl Instant {
    /// The zero instant. Only meaningful relative to other `Instant`s
    /// produced by the same `Clock`.
    pub const ZERO: Instant = Instant(0);

    /// Build an instant directly from a nanosecond offset. Intended for
    /// clock implementations and tests, not general call sites.
    pub const fn from_nanos(nanos: u64) -> Self {
        Instant(nanos)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Sub for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant(self.0.saturating_add(rhs.as_nanos() as u64))
    }
}

impl Instant {
    /// Subtract a duration, saturating at [`Instant::ZERO`] rather than
    /// underflowing.
    pub fn saturating_sub(self, rhs: Duration) -> Instant {
        Instant(self.0.saturating_sub(rhs.as_nanos() as u64))
    }
}

/// A capability that produces monotonic instants.
///
/// Implementations must never go backwards and must never derive values
/// from wall-clock time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Production binding: wraps `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock {
    epoch: Option<std::time::Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Some(std::time::Instant::now()),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        let epoch = self.epoch.unwrap_or_else(std::time::Instant::now);
        Instant::from_nanos(std::time::Instant::now().saturating_duration_since(epoch).as_nanos() as u64)
    }
}

/// Deterministic clock for tests. Advance it explicitly with [`MockClock::advance`].
///
/// Cheap to clone: clones share the same underlying cell, so advancing one
/// handle advances every handle, the way a real clock is a single source of
/// truth for every reader.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<AtomicU64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, instant: Instant) {
        self.now.store(instant.as_nanos(), Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_nanos(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_advances_monotonically() {
        let clock = MockClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_millis(20));
        let t1 = clock.now();
        assert_eq!(t1 - t0, Duration::from_millis(20));
        assert!(t1 > t0);
    }

    #[test]
    fn mock_clock_clones_share_state() {
        let clock = MockClock::new();
        let handle = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), handle.now());
    }

    #[test]
    fn instant_subtraction_never_underflows() {
        let a = Instant::from_nanos(10);
        let b = Instant::from_nanos(20);
        assert_eq!(a.saturating_duration_since(b), Duration::ZERO);
    }
}
