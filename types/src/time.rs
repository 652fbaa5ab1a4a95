//! Timestamp type and the clock seam.
//!
//! Timestamps are Unix epoch seconds (UTC). The engine never reads the system
//! clock directly; it asks a [`Clock`] so tests can drive time by hand.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A system clock set before the Unix epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// This timestamp shifted forward by `secs`, saturating at `u64::MAX`.
    pub fn plus_secs(&self, secs: u64) -> Timestamp {
        Self(self.0.saturating_add(secs))
    }

    /// Whether `now` is strictly past this timestamp.
    pub fn is_passed(&self, now: Timestamp) -> bool {
        now.0 > self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_inclusive() {
        let deadline = Timestamp::new(100);
        assert!(!deadline.is_passed(Timestamp::new(99)));
        assert!(!deadline.is_passed(Timestamp::new(100)));
        assert!(deadline.is_passed(Timestamp::new(101)));
    }

    #[test]
    fn plus_secs_saturates() {
        let ts = Timestamp::new(u64::MAX - 1);
        assert_eq!(ts.plus_secs(10), Timestamp::new(u64::MAX));
    }

    #[test]
    fn elapsed_never_negative() {
        let later = Timestamp::new(500);
        assert_eq!(later.elapsed_since(Timestamp::new(400)), 0);
        assert_eq!(Timestamp::new(400).elapsed_since(later), 100);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now() > Timestamp::EPOCH);
    }
}
