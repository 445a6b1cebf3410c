//! Calendar windows used to bound collection queries

use std::fmt;

use chrono::{Datelike, Month, Months, NaiveDate};

use crate::error::{Error, Result};

/// Convert a 1-based month number into a [`Month`]
pub fn month_from_number(month: u32) -> Result<Month> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or(Error::InvalidMonth(month))
}

/// Last calendar day of `month` in `year` (handles leap-year February)
pub fn last_day_of_month(year: i32, month: Month) -> Result<u32> {
    let first = NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)
        .ok_or(Error::InvalidYear(year))?;
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .ok_or(Error::InvalidYear(year))
}

/// Inclusive date range `[start, end]` bounding a collection query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidParameter {
                name: "time_window",
                value: format!("{start}/{end}"),
                reason: "end precedes start".into(),
            });
        }
        Ok(Self { start, end })
    }

    /// Day 1 through the last day of `month`
    pub fn month(year: i32, month: Month) -> Result<Self> {
        let m = month.number_from_month();
        let last = last_day_of_month(year, month)?;
        let start = NaiveDate::from_ymd_opt(year, m, 1).ok_or(Error::InvalidYear(year))?;
        let end = NaiveDate::from_ymd_opt(year, m, last).ok_or(Error::InvalidYear(year))?;
        Self::new(start, end)
    }

    /// January 1 through December 31
    pub fn year(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(Error::InvalidYear(year))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(Error::InvalidYear(year))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the window (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// RFC 3339 interval covering whole days, as STAC `datetime` expects
    pub fn to_rfc3339_interval(&self) -> String {
        format!(
            "{}T00:00:00Z/{}T23:59:59Z",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
