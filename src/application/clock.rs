// Wall-clock source for sync timestamps and schedule triggers
use chrono::{DateTime, NaiveDateTime, Utc};

pub trait Clock: Send + Sync {
    /// Local time, used for stored timestamps
    fn now(&self) -> NaiveDateTime;

    /// UTC time, used to align schedule triggers
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
