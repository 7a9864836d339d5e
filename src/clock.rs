//! Injectable wall clock. "Years back" windows and execution timestamps read
//! time through this so tests can pin it.

use std::sync::Arc;

use time::{Date, OffsetDateTime};

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    pub fn at_date(date: Date) -> Self {
        Self(date.midnight().assume_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub type SharedClock = Arc<dyn Clock>;

/// `date` moved back by whole years; Feb 29 falls back to Feb 28. Spans past
/// the earliest representable year clamp to `Date::MIN`.
pub fn years_before(date: Date, years: u32) -> Date {
    let Some(year) = i32::try_from(years).ok().and_then(|y| date.year().checked_sub(y)) else {
        return Date::MIN;
    };
    Date::from_calendar_date(year, date.month(), date.day())
        .or_else(|_| Date::from_calendar_date(year, date.month(), date.day().saturating_sub(1)))
        .unwrap_or(Date::MIN)
}
