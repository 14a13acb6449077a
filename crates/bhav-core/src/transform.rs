//! Row/column transform of raw bhavdata tables.
//!
//! [`normalize`] turns a raw table into the normalized 7-column table:
//!
//! 1. project the schema's source positions (aborting on narrow input),
//! 2. keep rows whose series contains the filter token,
//! 3. rewrite the trade date as `YYYYMMDD` (unparseable dates become null),
//! 4. drop the series column.
//!
//! [`normalize_file`] applies the same steps to a CSV on disk and overwrites it.
//! The transform is not idempotent: its own 7-column output is rejected with
//! [`BhavError::SchemaTooNarrow`].

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument, warn};

use crate::{
    calendar::NORMALIZED_FORMAT,
    error::{BhavError, Result},
    schema::{ColumnRole, SourceSchema},
};

/// Date-only layouts tried by [`parse_lenient_date`], in order.
///
/// Slash and dash numeric forms are tried month-first, then day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Two-digit-year layouts, tried after every four-digit layout has been rejected.
///
/// Years 00-68 map to 20xx and 69-99 to 19xx.
const SHORT_YEAR_FORMATS: &[&str] = &[
    "%d-%b-%y",
    "%d %b %y",
    "%m/%d/%y",
    "%d/%m/%y",
    "%m-%d-%y",
    "%d-%m-%y",
    "%d.%m.%y",
];

/// Date-time layouts tried by [`parse_lenient_date`]; the time part is discarded.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
];

/// Counters describing one transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    /// Data rows in the source table.
    pub rows_read: usize,
    /// Rows that passed the series filter and were written.
    pub rows_retained: usize,
    /// Retained rows whose trade date could not be parsed and was nulled.
    pub unparsed_dates: usize,
    /// True when the date column had values but none of them parsed.
    pub date_column_failed: bool,
}

/// A normalized table together with its transform counters.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The 7-column output table.
    pub frame: DataFrame,
    /// What the transform did.
    pub report: TransformReport,
}

/// Parses a date in any of the layouts upstream files have used.
///
/// Surrounding whitespace is ignored. Returns `None` rather than failing.
/// A four-digit layout only matches when the input spells the year with four
/// digits, so `05-Jan-24` is read as 2024 rather than year 24.
#[must_use]
pub fn parse_lenient_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value[..4].parse().ok()?;
        let month = value[4..6].parse().ok()?;
        let day = value[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let full_year = |date: &NaiveDate| has_four_digit_year(value, date);

    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .find(full_year)
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
                .find(full_year)
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
                .filter(full_year)
        })
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

/// `%Y` accepts any number of digits; require the year to appear zero-padded to four.
fn has_four_digit_year(value: &str, date: &NaiveDate) -> bool {
    value.contains(&format!("{:04}", date.year()))
}

/// Reads CSV bytes with a header row into an all-string table.
pub fn read_table(bytes: &[u8]) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| BhavError::Parse(e.to_string()))
}

/// Writes a table as CSV with a header row and no index column.
pub fn write_table(frame: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(frame)
        .map_err(|e| BhavError::Parse(e.to_string()))?;
    Ok(buf)
}

/// Normalizes a raw table using the bhavdata schema.
pub fn normalize(raw: &DataFrame) -> Result<Normalized> {
    normalize_with(&SourceSchema::BHAVDATA, raw)
}

/// Normalizes a raw table using an explicit source schema.
pub fn normalize_with(schema: &SourceSchema, raw: &DataFrame) -> Result<Normalized> {
    let mut report = TransformReport {
        rows_read: raw.height(),
        ..Default::default()
    };

    let projected = project(schema, raw)?;

    let series_slot = schema
        .slot(ColumnRole::Series)
        .ok_or_else(|| BhavError::InvalidParameter("schema has no series column".to_string()))?;
    let filtered = filter_series(&projected, series_slot, schema.filter_token())?;
    report.rows_retained = filtered.height();

    let mut frame = filtered;
    if let Some(date_slot) = schema.slot(ColumnRole::TradeDate) {
        normalize_dates(&mut frame, date_slot, &mut report)?;
    }

    let series_name = frame.get_columns()[series_slot].name().clone();
    let frame = frame
        .drop(series_name.as_str())
        .map_err(|e| BhavError::Parse(e.to_string()))?;

    debug!(
        rows_read = report.rows_read,
        rows_retained = report.rows_retained,
        unparsed_dates = report.unparsed_dates,
        "Normalized table"
    );

    Ok(Normalized { frame, report })
}

/// Normalizes CSV bytes and returns the rewritten CSV.
pub fn normalize_bytes(bytes: &[u8]) -> Result<(Vec<u8>, TransformReport)> {
    let raw = read_table(bytes)?;
    let Normalized { mut frame, report } = normalize(&raw)?;
    Ok((write_table(&mut frame)?, report))
}

/// Normalizes the CSV at `path` in place.
///
/// The file is read fully before anything is written; any error before the
/// write leaves it untouched.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn normalize_file(path: &Path) -> Result<TransformReport> {
    let bytes = std::fs::read(path)?;
    let (out, report) = normalize_bytes(&bytes)?;
    std::fs::write(path, out)?;
    Ok(report)
}

/// Selects the schema's source positions, trimming header names and values.
fn project(schema: &SourceSchema, raw: &DataFrame) -> Result<DataFrame> {
    if raw.width() < schema.min_columns() {
        return Err(BhavError::SchemaTooNarrow {
            required: schema.min_columns(),
            found: raw.width(),
        });
    }

    let columns = raw.get_columns();
    let mut taken = HashSet::new();
    let projected = schema
        .projection()
        .map(|position| {
            let column = &columns[position];
            let name = unique_name(column.name().trim(), &mut taken);
            trimmed(column, name)
        })
        .collect::<Result<Vec<_>>>()?;

    DataFrame::new(projected).map_err(|e| BhavError::Parse(e.to_string()))
}

/// Returns `name`, or `name.1`, `name.2`, ... when an earlier column already took it.
fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut suffix = 0;
    while !taken.insert(candidate.clone()) {
        suffix += 1;
        candidate = format!("{name}.{suffix}");
    }
    candidate
}

fn trimmed(column: &Column, name: String) -> Result<Column> {
    let name = PlSmallStr::from(name);
    let values = string_values(column)?;
    let values: Vec<Option<String>> = values
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect();
    Ok(Column::new(name, values))
}

fn string_values(column: &Column) -> Result<StringChunked> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::String)
        .map_err(|e| BhavError::Parse(e.to_string()))?;
    series
        .str()
        .cloned()
        .map_err(|e| BhavError::Parse(e.to_string()))
}

/// Keeps rows whose series value, upper-cased, contains `token`; nulls are dropped.
fn filter_series(frame: &DataFrame, slot: usize, token: &str) -> Result<DataFrame> {
    let series = string_values(&frame.get_columns()[slot])?;
    let mask: BooleanChunked = series
        .into_iter()
        .map(|v| v.is_some_and(|s| s.trim().to_uppercase().contains(token)))
        .collect();
    frame
        .filter(&mask)
        .map_err(|e| BhavError::Parse(e.to_string()))
}

/// Rewrites the date column as `YYYYMMDD`, nulling values that do not parse.
fn normalize_dates(
    frame: &mut DataFrame,
    slot: usize,
    report: &mut TransformReport,
) -> Result<()> {
    let column = &frame.get_columns()[slot];
    let name = column.name().clone();

    let mut present = 0;
    let dates = string_values(column)?;
    let values: Vec<Option<String>> = dates
        .into_iter()
        .map(|v| {
            let v = v.filter(|s| !s.trim().is_empty())?;
            present += 1;
            let parsed = parse_lenient_date(v);
            if parsed.is_none() {
                report.unparsed_dates += 1;
            }
            parsed.map(|d| d.format(NORMALIZED_FORMAT).to_string())
        })
        .collect();

    if present > 0 && report.unparsed_dates == present {
        report.date_column_failed = true;
        warn!(
            column = %name,
            values = present,
            "No value in the date column could be parsed, writing nulls"
        );
    } else if report.unparsed_dates > 0 {
        debug!(
            column = %name,
            unparsed = report.unparsed_dates,
            "Some dates could not be parsed"
        );
    }

    frame
        .with_column(Column::new(name, values))
        .map_err(|e| BhavError::Parse(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "SYMBOL, SERIES, DATE1, PREV_CLOSE, OPEN_PRICE, HIGH_PRICE, LOW_PRICE, \
                          LAST_PRICE, CLOSE_PRICE, AVG_PRICE, TTL_TRD_QNTY, TURNOVER_LACS, \
                          NO_OF_TRADES, DELIV_QTY, DELIV_PER";

    fn row(symbol: &str, series: &str, date: &str) -> String {
        format!(
            "{symbol},{series},{date}, 100.0, 101.5, 104.0, 99.5, 103.0, 103.2, 102.1, 5000, 51.2, 120, 2500, 50.00"
        )
    }

    fn csv(rows: &[String]) -> Vec<u8> {
        let mut out = String::from(HEADER);
        for r in rows {
            out.push('\n');
            out.push_str(r);
        }
        out.push('\n');
        out.into_bytes()
    }

    fn fourteen_columns(series: &str, date: &str) -> Vec<u8> {
        let header = (0..14).map(|i| format!("c{i}")).collect::<Vec<_>>().join(",");
        let mut values: Vec<String> = (0..14).map(|i| format!("v{i}")).collect();
        values[0] = "RELIANCE".to_string();
        values[1] = series.to_string();
        values[2] = date.to_string();
        format!("{header}\n{}\n", values.join(",")).into_bytes()
    }

    fn cell(frame: &DataFrame, column: usize, row: usize) -> Option<String> {
        string_values(&frame.get_columns()[column])
            .unwrap()
            .get(row)
            .map(str::to_string)
    }

    #[test]
    fn test_parse_lenient_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_lenient_date("2024-01-05"), expected);
        assert_eq!(parse_lenient_date(" 05-Jan-2024"), expected);
        assert_eq!(parse_lenient_date("05-JAN-2024"), expected);
        assert_eq!(parse_lenient_date("20240105"), expected);
        assert_eq!(parse_lenient_date("01/05/2024"), expected);
        assert_eq!(parse_lenient_date("25/12/2024"), NaiveDate::from_ymd_opt(2024, 12, 25));
        assert_eq!(parse_lenient_date("2024-01-05 15:30:00"), expected);
        assert_eq!(parse_lenient_date("2024-01-05T15:30:00+05:30"), expected);
        assert_eq!(parse_lenient_date("not a date"), None);
        assert_eq!(parse_lenient_date("   "), None);
        assert_eq!(parse_lenient_date("20241341"), None);
    }

    #[test]
    fn test_parse_lenient_date_two_digit_years() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_lenient_date("05-Jan-24"), expected);
        assert_eq!(parse_lenient_date("1/5/24"), expected);
        assert_eq!(parse_lenient_date("05.01.24"), expected);
        assert_eq!(parse_lenient_date("31-Dec-99"), NaiveDate::from_ymd_opt(1999, 12, 31));
        // Explicitly zero-padded years are still taken literally
        assert_eq!(parse_lenient_date("0024-01-05"), NaiveDate::from_ymd_opt(24, 1, 5));
    }

    #[test]
    fn test_two_digit_year_written_as_full_date() {
        let (out, report) = normalize_bytes(&csv(&[row("RELIANCE", "EQ", "05-Jan-24")])).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("RELIANCE,20240105,"), "{text}");
        assert_eq!(report.unparsed_dates, 0);
    }

    #[test]
    fn test_normalize_fourteen_columns() {
        let raw = read_table(&fourteen_columns(" eq ", "2024-01-05")).unwrap();
        let Normalized { frame, report } = normalize(&raw).unwrap();

        assert_eq!(frame.width(), 7);
        assert_eq!(frame.height(), 1);
        let names: Vec<_> = frame.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["c0", "c2", "c4", "c5", "c6", "c8", "c13"]);
        assert_eq!(cell(&frame, 1, 0).as_deref(), Some("20240105"));
        assert_eq!(report.rows_read, 1);
        assert_eq!(report.rows_retained, 1);
        assert_eq!(report.unparsed_dates, 0);
    }

    #[test]
    fn test_normalize_drops_non_equity_rows() {
        let raw = read_table(&fourteen_columns("BE", "2024-01-05")).unwrap();
        let Normalized { frame, report } = normalize(&raw).unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(frame.width(), 7);
        assert_eq!(report.rows_retained, 0);
        assert!(!report.date_column_failed);
    }

    #[test]
    fn test_normalize_bhavdata_layout() {
        let bytes = csv(&[
            row("RELIANCE", " EQ", " 05-Jan-2024"),
            row("TATAGOLD", " ETF", " 05-Jan-2024"),
            row("GOLDBEES", " BE", " 05-Jan-2024"),
            row("INFY", " eq", " garbage"),
            row("SGBJAN29", " GB", " 05-Jan-2024"),
        ]);
        let (out, report) = normalize_bytes(&bytes).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("SYMBOL,DATE1,OPEN_PRICE,HIGH_PRICE,LOW_PRICE,CLOSE_PRICE,DELIV_QTY")
        );
        assert_eq!(lines.next(), Some("RELIANCE,20240105,101.5,104.0,99.5,103.2,2500"));
        assert_eq!(lines.next(), Some("INFY,,101.5,104.0,99.5,103.2,2500"));
        assert_eq!(lines.next(), None);

        assert_eq!(report.rows_read, 5);
        assert_eq!(report.rows_retained, 2);
        assert_eq!(report.unparsed_dates, 1);
        assert!(!report.date_column_failed);
    }

    #[test]
    fn test_whole_date_column_failure_still_writes() {
        let bytes = csv(&[row("RELIANCE", "EQ", "n/a"), row("INFY", "EQ", "tbd")]);
        let (out, report) = normalize_bytes(&bytes).unwrap();
        assert!(report.date_column_failed);
        assert_eq!(report.unparsed_dates, 2);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_headers_equal_after_trimming_are_suffixed() {
        let mut header: Vec<String> = (0..14).map(|i| format!("c{i}")).collect();
        header[13] = "c0 ".to_string();
        let bytes = format!("{}\nRELIANCE,EQ,2024-01-05,1,2,3,4,5,6,7,8,9,10,11\n", header.join(","));

        let (out, report) = normalize_bytes(bytes.as_bytes()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("c0,c2,c4,c5,c6,c8,c0.1"));
        assert_eq!(lines.next(), Some("RELIANCE,20240105,2,3,4,6,11"));
        assert_eq!(report.rows_retained, 1);
    }

    #[test]
    fn test_unique_name() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("A", &mut taken), "A");
        assert_eq!(unique_name("A", &mut taken), "A.1");
        assert_eq!(unique_name("A", &mut taken), "A.2");
        assert_eq!(unique_name("B", &mut taken), "B");
    }

    #[test]
    fn test_narrow_table_rejected() {
        let header = (0..10).map(|i| format!("c{i}")).collect::<Vec<_>>().join(",");
        let raw = read_table(format!("{header}\na,EQ,2024-01-05,1,2,3,4,5,6,7\n").as_bytes())
            .unwrap();
        let err = normalize(&raw).unwrap_err();
        assert!(matches!(
            err,
            BhavError::SchemaTooNarrow {
                required: 14,
                found: 10
            }
        ));
    }

    #[test]
    fn test_normalize_file_narrow_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sec_bhavdata_full_05012024.csv");
        let header = (0..10).map(|i| format!("c{i}")).collect::<Vec<_>>().join(",");
        let original = format!("{header}\nx, EQ ,2024-01-05,1,2,3,4,5,6,7\n");
        std::fs::write(&path, &original).unwrap();

        let err = normalize_file(&path).unwrap_err();
        assert!(matches!(err, BhavError::SchemaTooNarrow { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), original.as_bytes());
    }

    #[test]
    fn test_normalize_file_is_not_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sec_bhavdata_full_05012024.csv");
        std::fs::write(&path, csv(&[row("RELIANCE", "EQ", "05-Jan-2024")])).unwrap();

        let report = normalize_file(&path).unwrap();
        assert_eq!(report.rows_retained, 1);
        let normalized = std::fs::read(&path).unwrap();

        let err = normalize_file(&path).unwrap_err();
        assert!(matches!(
            err,
            BhavError::SchemaTooNarrow {
                required: 14,
                found: 7
            }
        ));
        assert_eq!(std::fs::read(&path).unwrap(), normalized);
    }

    #[test]
    fn test_normalize_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = normalize_file(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, BhavError::Io(_)));
    }
}
