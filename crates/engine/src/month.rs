//! Calendar month keys (`YYYY-MM`) and their UTC boundaries.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A calendar month in UTC, written `YYYY-MM`.
///
/// The key is validated on construction, so boundaries can always be
/// computed.
///
/// ```rust
/// use engine::MonthKey;
///
/// let month: MonthKey = "2024-12".parse().unwrap();
/// let (start, end) = month.bounds();
/// assert_eq!(start.to_rfc3339(), "2024-12-01T00:00:00+00:00");
/// assert_eq!(end.to_rfc3339(), "2024-12-31T23:59:59.999+00:00");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    first_day: NaiveDate,
    next_first_day: NaiveDate,
}

impl MonthKey {
    /// Builds a key from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> ResultEngine<Self> {
        let invalid = || EngineError::InvalidMonth(format!("{year:04}-{month:02}"));
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_first_day = first_day
            .checked_add_months(Months::new(1))
            .ok_or_else(invalid)?;
        Ok(Self {
            first_day,
            next_first_day,
        })
    }

    /// The month a UTC instant falls in.
    pub fn of(at: DateTime<Utc>) -> ResultEngine<Self> {
        Self::new(at.year(), at.month())
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// First instant (`00:00:00.000`) and last instant (`23:59:59.999`) of
    /// the month, both inclusive.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.first_day.and_time(NaiveTime::MIN).and_utc();
        let end =
            self.next_first_day.and_time(NaiveTime::MIN).and_utc() - TimeDelta::milliseconds(1);
        (start, end)
    }

    /// Returns `true` when `at` lies within [`MonthKey::bounds`].
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds();
        start <= at && at <= end
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for MonthKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidMonth(format!("expected YYYY-MM, got \"{s}\""));
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let (year, month) = (&s[..4], &s[5..]);
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MonthKey {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}
