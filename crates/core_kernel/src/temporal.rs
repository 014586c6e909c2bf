//! Calendar-month temporal types
//!
//! Period closing, carry-forward chaining, and recurring charge generation
//! all operate at calendar-month granularity. This module provides the
//! `YearMonth` value type and an inclusive month-range iterator so that
//! month arithmetic lives in one place instead of being re-derived from raw
//! dates throughout the engine.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid month: {0} (must be 1-12)")]
    InvalidMonth(u32),

    #[error("Invalid range: start {start} must not be after end {end}")]
    InvalidRange { start: String, end: String },
}

/// A calendar month (year + month), the granularity of period closing
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Creates a new YearMonth, validating the month number
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1..=12).contains(&month) {
            return Err(TemporalError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    /// Returns the month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the first day of this month
    pub fn first_day(&self) -> NaiveDate {
        // Month is validated on construction, so this cannot fail.
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("validated year-month")
    }

    /// Returns the last day of this month
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().expect("valid date")
    }

    /// Returns the following month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns the preceding month
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Returns the number of months from `earlier` to `self`
    ///
    /// Negative when `earlier` is actually later.
    pub fn months_since(&self, earlier: YearMonth) -> i32 {
        (self.year - earlier.year) * 12 + self.month as i32 - earlier.month as i32
    }

    /// Returns true if the given date falls within this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Returns an inclusive iterator from self through `end`
    pub fn range_to(&self, end: YearMonth) -> Result<MonthRange, TemporalError> {
        if *self > end {
            return Err(TemporalError::InvalidRange {
                start: self.to_string(),
                end: end.to_string(),
            });
        }
        Ok(MonthRange {
            next: Some(*self),
            end,
        })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

/// Inclusive iterator over a span of calendar months
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: Option<YearMonth>,
    end: YearMonth,
}

impl Iterator for MonthRange {
    type Item = YearMonth;

    fn next(&mut self) -> Option<YearMonth> {
        let current = self.next?;
        self.next = if current < self.end {
            Some(current.next())
        } else {
            None
        };
        Some(current)
    }
}
