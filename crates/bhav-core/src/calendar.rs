//! Trading calendar and batch planning.
//!
//! This module defines:
//!
//! - [`adjust`] - Maps a calendar date to its most recent weekday
//! - [`TradingDate`] - A calendar date known to fall on Monday to Friday
//! - [`DateKey`] - The `DDMMYYYY` key naming one archive file
//! - [`DateRange`] - An inclusive, restartable range of calendar dates
//! - [`TradingDateSet`] - Distinct trading dates of a range, ascending
//! - [`plan_trading_dates`] - Builds a [`TradingDateSet`] from window bounds
//!
//! Market holidays are not modelled. A weekday holiday is planned like any other
//! trading date and its fetch fails as an ordinary not-found.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{BhavError, Result};

/// Approximate length of the default five-year planning window, in days.
pub const DEFAULT_WINDOW_DAYS: u64 = 5 * 365;

/// Format of archive keys (`DDMMYYYY`).
const KEY_FORMAT: &str = "%d%m%Y";

/// Prefix of archive and persisted file names.
pub const FILE_PREFIX: &str = "sec_bhavdata_full_";

/// Format of normalized trade dates (`YYYYMMDD`).
pub const NORMALIZED_FORMAT: &str = "%Y%m%d";

/// Maps a calendar date to the most recent weekday.
///
/// Saturday becomes the preceding Friday (1 day back), Sunday the preceding Friday
/// (2 days back); Monday to Friday are returned unchanged. The result is idempotent:
/// `adjust(adjust(d)) == adjust(d)`.
///
/// At the lower bound of the calendar the subtraction cannot be represented and
/// the date is returned as is, which [`TradingDate::new`] then rejects.
#[must_use]
pub fn adjust(date: NaiveDate) -> NaiveDate {
    let back = match date.weekday() {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => return date,
    };
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// Returns true if the date falls on Monday through Friday.
#[must_use]
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// A calendar date whose weekday is Monday through Friday.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradingDate(NaiveDate);

impl TradingDate {
    /// Wraps a date if it falls on a weekday.
    #[must_use]
    pub fn new(date: NaiveDate) -> Option<Self> {
        is_weekday(date).then_some(Self(date))
    }

    /// Applies [`adjust`] and wraps the result.
    ///
    /// Returns `None` only when the adjustment could not move a weekend date,
    /// i.e. at the lower bound of the calendar.
    #[must_use]
    pub fn from_calendar(date: NaiveDate) -> Option<Self> {
        Self::new(adjust(date))
    }

    /// Returns the underlying calendar date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the calendar year, used as the partition directory name.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the archive key for this date.
    #[must_use]
    pub fn key(&self) -> DateKey {
        DateKey::from_date(self.0)
    }
}

impl fmt::Display for TradingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-padded `DDMMYYYY` key naming one archive file.
///
/// Keys are validated on construction: exactly eight ASCII digits that form a
/// real calendar date.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(String);

impl DateKey {
    /// Builds the key for any calendar date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(KEY_FORMAT).to_string())
    }

    /// Parses a `DDMMYYYY` string, trimming surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BhavError::DateParse(format!(
                "expected 8 digits in DDMMYYYY form, got {s:?}"
            )));
        }
        let date = NaiveDate::parse_from_str(s, KEY_FORMAT)
            .map_err(|e| BhavError::DateParse(format!("{s:?} is not a calendar date: {e}")))?;
        Ok(Self::from_date(date))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the archive file name: `sec_bhavdata_full_<DDMMYYYY>.csv`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{FILE_PREFIX}{}.csv", self.0)
    }

    /// Returns the 4-digit year component.
    #[must_use]
    pub fn year(&self) -> &str {
        &self.0[4..]
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DateKey {
    type Err = BhavError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DateKey {
    type Error = BhavError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.0
    }
}

/// Inclusive range of calendar dates.
///
/// Iteration is lazy and the range can be iterated any number of times.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date of the range.
    pub start: NaiveDate,
    /// Last date of the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range; an `end` before `start` gives an empty range.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days`-long window ending at `end`: `end - days ..= end`.
    #[must_use]
    pub fn trailing(end: NaiveDate, days: u64) -> Self {
        let start = end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Number of calendar dates in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    /// Returns true if the range contains no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates every date from `start` to `end` inclusive.
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.start.iter_days().take(self.len())
    }
}

/// Distinct trading dates of a window, ascending.
///
/// Built once by [`plan_trading_dates`] and never mutated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TradingDateSet(Vec<TradingDate>);

impl TradingDateSet {
    /// Number of planned dates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no dates were planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Planned dates in ascending order.
    #[must_use]
    pub fn as_slice(&self) -> &[TradingDate] {
        &self.0
    }

    /// Iterates planned dates in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, TradingDate> {
        self.0.iter()
    }

    /// Earliest planned date.
    #[must_use]
    pub fn first(&self) -> Option<TradingDate> {
        self.0.first().copied()
    }

    /// Latest planned date.
    #[must_use]
    pub fn last(&self) -> Option<TradingDate> {
        self.0.last().copied()
    }
}

impl<'a> IntoIterator for &'a TradingDateSet {
    type Item = &'a TradingDate;
    type IntoIter = std::slice::Iter<'a, TradingDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<NaiveDate> for TradingDateSet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        let unique: BTreeSet<TradingDate> = iter
            .into_iter()
            .filter_map(TradingDate::from_calendar)
            .collect();
        Self(unique.into_iter().collect())
    }
}

/// Plans the distinct trading dates of `window_start ..= window_end`.
///
/// Every calendar date is adjusted with [`adjust`], anything that is still not a
/// weekday is dropped, and the survivors are deduplicated and sorted ascending.
#[must_use]
pub fn plan_trading_dates(window_start: NaiveDate, window_end: NaiveDate) -> TradingDateSet {
    DateRange::new(window_start, window_end).iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_adjust_weekend_to_friday() {
        // 2024-01-05 is a Friday
        let friday = date(2024, 1, 5);
        assert_eq!(adjust(date(2024, 1, 6)), friday);
        assert_eq!(adjust(date(2024, 1, 7)), friday);
        assert_eq!(adjust(friday), friday);
        assert_eq!(adjust(date(2024, 1, 8)), date(2024, 1, 8));
    }

    #[test]
    fn test_adjust_always_weekday_and_idempotent() {
        for d in DateRange::new(date(2023, 12, 1), date(2024, 3, 31)).iter() {
            let adjusted = adjust(d);
            assert!(is_weekday(adjusted), "{d} adjusted to {adjusted}");
            assert_eq!(adjust(adjusted), adjusted);
            assert!(adjusted <= d);
        }
    }

    #[test]
    fn test_adjust_at_calendar_lower_bound() {
        if let Some(t) = TradingDate::from_calendar(NaiveDate::MIN) {
            assert!(is_weekday(t.date()));
        }
    }

    #[test]
    fn test_date_range_len_and_iteration() {
        let range = DateRange::new(date(2024, 2, 27), date(2024, 3, 2));
        assert_eq!(range.len(), 5);
        let days: Vec<_> = range.iter().collect();
        assert_eq!(days.first(), Some(&date(2024, 2, 27)));
        assert_eq!(days.last(), Some(&date(2024, 3, 2)));
        // Restartable
        assert_eq!(range.iter().count(), 5);

        let empty = DateRange::new(date(2024, 3, 2), date(2024, 2, 27));
        assert!(empty.is_empty());
        assert_eq!(empty.iter().count(), 0);
    }

    #[test]
    fn test_trailing_default_window() {
        let today = date(2026, 10, 19);
        let range = DateRange::trailing(today, DEFAULT_WINDOW_DAYS);
        assert_eq!(range.end, today);
        assert_eq!(range.len(), 5 * 365 + 1);
    }

    #[test]
    fn test_plan_week_collapses_weekend() {
        // Monday 2024-01-01 through Sunday 2024-01-07
        let plan = plan_trading_dates(date(2024, 1, 1), date(2024, 1, 7));
        let dates: Vec<_> = plan.iter().map(TradingDate::date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 2),
                date(2024, 1, 3),
                date(2024, 1, 4),
                date(2024, 1, 5),
            ]
        );
        let fridays = dates.iter().filter(|d| **d == date(2024, 1, 5)).count();
        assert_eq!(fridays, 1);
    }

    #[test]
    fn test_plan_starting_on_weekend_reaches_back() {
        // Window opens on Sunday 2024-01-07; its Friday precedes the window
        let plan = plan_trading_dates(date(2024, 1, 7), date(2024, 1, 8));
        assert_eq!(plan.first().map(|t| t.date()), Some(date(2024, 1, 5)));
        assert_eq!(plan.last().map(|t| t.date()), Some(date(2024, 1, 8)));
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_plan_is_strictly_ascending_across_years() {
        let plan = plan_trading_dates(date(2019, 12, 20), date(2021, 1, 10));
        let slice = plan.as_slice();
        assert!(slice.windows(2).all(|w| w[0] < w[1]));
        assert!(slice.iter().all(|t| is_weekday(t.date())));
        // Chronological, not lexicographic on DDMMYYYY
        assert_eq!(plan.first().map(|t| t.year()), Some(2019));
        assert_eq!(plan.last().map(|t| t.year()), Some(2021));
    }

    #[test]
    fn test_trading_date_renderings() {
        let t = TradingDate::new(date(2024, 1, 5)).unwrap();
        assert_eq!(t.key().as_str(), "05012024");
        assert_eq!(t.year(), 2024);
        assert!(TradingDate::new(date(2024, 1, 6)).is_none());
    }

    #[test]
    fn test_date_key_parse() {
        let key = DateKey::parse(" 05012024\n").unwrap();
        assert_eq!(key.as_str(), "05012024");
        assert_eq!(key, TradingDate::new(date(2024, 1, 5)).unwrap().key());
        assert_eq!(key.year(), "2024");
        assert_eq!(key.file_name(), "sec_bhavdata_full_05012024.csv");

        assert!(DateKey::parse("5012024").is_err());
        assert!(DateKey::parse("2024-01-05").is_err());
        assert!(DateKey::parse("31022024").is_err());
        assert!("0501202a".parse::<DateKey>().is_err());
    }
}
