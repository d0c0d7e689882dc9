//! Shared fixtures for unit tests.

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use std::sync::Mutex;

/// Clock frozen at a fixed instant until advanced explicitly.
#[derive(Debug)]
pub(crate) struct AdjustableClock {
    now: Mutex<DateTime<Utc>>,
}

impl AdjustableClock {
    pub(crate) const fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(crate) fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Default for AdjustableClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid start instant");
        Self::at(start)
    }
}

impl Clock for AdjustableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}
