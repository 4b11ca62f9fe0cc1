// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A clock tests can set and advance.

use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone};
use nutria_core::Clock;

/// Manually driven [`Clock`]. Time only moves when the test moves it.
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// A clock at the given local date and time.
    ///
    /// Panics on a time that does not exist in the local zone.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid calendar date");
        let local = Local
            .from_local_datetime(&naive)
            .earliest()
            .expect("local time exists");
        Self::new(local)
    }

    pub fn set(&self, to: DateTime<Local>) {
        *self.lock() = to;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Local>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.lock()
    }
}
