//! Monthly periods and the fixed output window.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MapError;
use crate::grid::Cell;

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((1..=12).contains(&month) && (1900..=2999).contains(&year)).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Months since year 0; used for offset arithmetic.
    fn ordinal(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn add_months(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    /// Parse a period out of a spreadsheet cell. Only text and native dates
    /// qualify; bare numbers are never periods because value columns are numeric.
    pub fn from_cell(cell: &Cell) -> Option<Self> {
        match cell {
            Cell::Date(d) => Some(Self::from_date(*d)),
            Cell::Text(s) => parse_period_text(s),
            Cell::Number(_) | Cell::Empty => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_period_text(s).ok_or_else(|| MapError::InvalidPeriod(s.to_string()))
    }
}

impl TryFrom<String> for Period {
    type Error = MapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

/// Accepts `YYYY-MM`, `YYYY/MM`, `YYYY.MM`, `YYYYMM`, `YYYY년 MM월`, with an
/// optional trailing day (`YYYY-MM-DD`, `YYYY.MM.DD.`) or time part.
fn parse_period_text(raw: &str) -> Option<Period> {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    let digits: Vec<&str> = s
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .collect();

    match digits.as_slice() {
        [compact] if compact.len() == 6 && s.len() == 6 => {
            Period::new(compact[..4].parse().ok()?, compact[4..].parse().ok()?)
        }
        [year, month, ..] if year.len() == 4 && (1..=2).contains(&month.len()) => {
            // Reject free text that merely contains numbers.
            let leading = s.chars().next()?;
            if !leading.is_ascii_digit() {
                return None;
            }
            Period::new(year.parse().ok()?, month.parse().ok()?)
        }
        _ => None,
    }
}

/// The contiguous run of months the matrix covers, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    start: Period,
    len: usize,
}

impl MonthWindow {
    /// Window of `len` months whose last month is `end`.
    pub fn ending_at(end: Period, len: usize) -> Self {
        Self {
            start: end.add_months(1 - len as i64),
            len,
        }
    }

    pub fn start(&self) -> Period {
        self.start
    }

    pub fn end(&self) -> Period {
        self.start.add_months(self.len as i64 - 1)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Row offset of `period` inside the window.
    pub fn index_of(&self, period: Period) -> Option<usize> {
        let offset = period.ordinal() - self.start.ordinal();
        (0..self.len as i64).contains(&offset).then_some(offset as usize)
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        (0..self.len as i64).map(move |i| self.start.add_months(i))
    }
}
