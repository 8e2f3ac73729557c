//! Settable clock for audit-stamp assertions.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

/// Clock pinned to an instant until a test moves it.
pub struct SchoolDayClock(Mutex<DateTime<Utc>>);

impl SchoolDayClock {
    /// Pin the clock to `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Pin the clock to 07:00 UTC on a fixed weekday.
    pub fn morning() -> Self {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 2, 7, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::at(now)
    }

    /// Move the clock forward.
    pub fn advance_minutes(&self, minutes: i64) {
        *self.lock() += TimeDelta::minutes(minutes);
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for SchoolDayClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
