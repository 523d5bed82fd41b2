//! Calendar month codes in `YYYYMM` form

use chrono::{Datelike, Local};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::MonthFormatError;

/// A calendar month, the addressing unit of one month page on the source site.
///
/// Ordering is derived from [`MonthCode::ordinal`], so two codes compare by
/// calendar position only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthCode {
    year: i32,
    month: u32,
}

impl MonthCode {
    /// Build a month code, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Result<Self, MonthFormatError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(MonthFormatError(format!("{:04}{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Const constructor for compile-time month constants.
    pub const fn new_const(year: i32, month: u32) -> Self {
        assert!(month >= 1 && month <= 12);
        Self { year, month }
    }

    /// The month the local clock is currently in.
    pub fn current() -> Self {
        let now = Local::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// Number of months since January of year 0.
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    /// Move to the next calendar month, rolling December over into January.
    pub fn advance(&mut self) {
        if self.month == 12 {
            self.year += 1;
            self.month = 1;
        } else {
            self.month += 1;
        }
    }

    /// The month after this one.
    pub fn next_month(self) -> Self {
        let mut next = self;
        next.advance();
        next
    }

    /// Every month from `begin` to `end` inclusive, ascending.
    /// Empty when `begin > end`.
    pub fn range_inclusive(begin: MonthCode, end: MonthCode) -> Months {
        Months {
            next: Some(begin).filter(|b| *b <= end),
            end,
        }
    }
}

impl fmt::Display for MonthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for MonthCode {
    type Err = MonthFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MonthFormatError(s.to_string());

        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[4..].parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Ord for MonthCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl PartialOrd for MonthCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Iterator over an inclusive month range, see [`MonthCode::range_inclusive`].
#[derive(Debug, Clone)]
pub struct Months {
    next: Option<MonthCode>,
    end: MonthCode,
}

impl Iterator for Months {
    type Item = MonthCode;

    fn next(&mut self) -> Option<MonthCode> {
        let current = self.next?;
        let following = current.next_month();
        self.next = Some(following).filter(|m| *m <= self.end);
        Some(current)
    }
}
