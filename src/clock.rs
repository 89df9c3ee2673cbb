//! Injectable time source.
//!
//! Every timestamp the core writes (`time_added`, `created`, `destroyed`,
//! `time_stamp`, ...) comes from a [`Clock`] so tests can pin time.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A pinned clock for tests; advances only when told to.
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock pinned at the given instant.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(instant),
        }
    }

    /// Creates a clock pinned at a calendar date/time (UTC).
    ///
    /// # Panics
    /// Panics when the components do not form a valid instant.
    #[must_use]
    pub fn at_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Self::at(
            Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
                .single()
                .expect("valid calendar instant"),
        )
    }

    /// Moves the clock to a new instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock().expect("clock lock") = instant;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.lock().expect("clock lock");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().expect("clock lock")
    }
}
