//! Inclusive calendar date ranges used as request filters.

use std::fmt;

use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Wire format for dates in query strings and reports.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated, inclusive date range (`start <= end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, returning `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The range from `days` days before `end` up to `end`.
    ///
    /// Both ends are inclusive, so it covers `days + 1` calendar days.
    pub fn ending_at(end: NaiveDate, days: u64) -> Self {
        let start = end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// `start_date` as sent to the data service.
    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// `end_date` as sent to the data service.
    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start_param(), self.end_param())
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        bail!("Empty date");
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}
