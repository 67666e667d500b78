//! Calendar arithmetic for building catalog query windows.
//!
//! Catalog searches are chunked per calendar month. A [`QueryWindow`] covers one
//! month and renders the `first/last` date-range string the catalog expects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Returns the number of days in `month` (1-12) of `year`.
///
/// February gets 29 days whenever the year is divisible by 4. The century
/// correction (1900, 2100, ...) is intentionally not applied, so 2100-02 has
/// 29 days here.
///
/// # Examples
///
/// ```
/// use gfm_flood::days_in_month;
///
/// assert_eq!(days_in_month(2021, 2), 28);
/// assert_eq!(days_in_month(2020, 2), 29);
/// assert_eq!(days_in_month(2021, 4), 30);
/// assert_eq!(days_in_month(2021, 1), 31);
/// ```
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        2 if year % 4 == 0 => 29,
        2 => 28,
        _ => 30,
    }
}

/// A calendar month of a specific year. The month number is always in `1..=12`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Month(i32, u32);
impl Month {
    /// Creates a month, returning `None` when `month` is outside `1..=12`.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(year, month))
    }
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// One calendar month used as the unit of catalog-query chunking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct QueryWindow(pub Month);

impl QueryWindow {
    pub fn month(self) -> Month {
        self.0
    }

    pub fn last_day_of_month(self) -> u32 {
        days_in_month(self.0.year(), self.0.month())
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0.year(), self.0.month(), 1)
    }

    /// `None` for dates chrono cannot represent, e.g. 29 February of a century
    /// year that the divisible-by-4 rule treats as leap.
    pub fn last_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0.year(), self.0.month(), self.last_day_of_month())
    }

    /// Renders the inclusive `YYYY-MM-01/YYYY-MM-DD` range of this month.
    pub fn date_range(self) -> String {
        format!("{}-01/{}-{:02}", self.0, self.0, self.last_day_of_month())
    }

    /// Every (year, month) pair of the inclusive cross-product, in ascending
    /// chronological order. Returns `None` if either month bound is invalid.
    pub fn cross_product(
        start_year: i32,
        end_year: i32,
        start_month: u32,
        end_month: u32,
    ) -> Option<Vec<QueryWindow>> {
        Month::new(start_month, start_year)?;
        Month::new(end_month, end_year)?;
        let mut windows = Vec::new();
        for year in start_year..=end_year {
            for month in start_month..=end_month {
                windows.push(QueryWindow(Month::new(month, year)?));
            }
        }
        Some(windows)
    }
}

impl Display for QueryWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.date_range())
    }
}

/// The span of months a result record summarises, e.g. `2021-01/2021-12`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: Month,
    pub end: Month,
}

impl Period {
    /// The `start_month..=end_month` span of a single year.
    pub fn within_year(year: i32, start_month: u32, end_month: u32) -> Option<Self> {
        let start = Month::new(start_month, year)?;
        let end = Month::new(end_month, year)?;
        (start <= end).then_some(Self { start, end })
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}
