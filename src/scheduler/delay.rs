//! Randomized deferral bounds.

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use std::time::Duration;

use crate::error::{Error, Result};

/// Inclusive `[min, max]` bounds for a deferral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(Error::Config(format!(
                "minimum delay {min:?} exceeds maximum delay {max:?}"
            )));
        }
        Ok(Self { min, max })
    }

    /// A degenerate range that always yields `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn contains(&self, delay: Duration) -> bool {
        self.min <= delay && delay <= self.max
    }

    /// Draw uniformly over whole milliseconds in the range.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = ceil_millis(self.min);
        let hi = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        // no whole millisecond inside the range
        if lo > hi {
            return self.min;
        }
        Duration::from_millis(rng.random_range(lo..=hi))
    }
}

/// `now + delay`, saturating at the end of representable time.
pub fn fire_time(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn ceil_millis(d: Duration) -> u64 {
    let ms = d.as_millis() + u128::from(d.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(ms).unwrap_or(u64::MAX)
}
