//! Wall-clock boundary.
//!
//! Every date-boundary and interval decision in the core reads time through
//! [`Clock`], so tests can pin "now" and step it across midnight.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date in the user's local timezone.
    fn today(&self) -> NaiveDate;
}

/// Host clock: UTC instants, dates in the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock with a fixed UTC offset.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock at local `HH:MM` on `date` in UTC.
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Self {
        Self::at_offset(date, hour, minute, 0)
    }

    /// Clock at local `HH:MM` on `date` with a UTC offset in hours.
    pub fn at_offset(date: NaiveDate, hour: u32, minute: u32, offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap_or(Utc.fix());
        let naive = date
            .and_hms_opt(hour, minute, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        let now = offset
            .from_local_datetime(&naive)
            .single()
            .unwrap_or_else(|| offset.from_utc_datetime(&naive));
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<FixedOffset>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().with_timezone(&Utc)
    }

    fn today(&self) -> NaiveDate {
        self.lock().date_naive()
    }
}
