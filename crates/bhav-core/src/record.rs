//! Typed view of normalized rows.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BhavError, Result};
use crate::transform::read_table;

/// One row of a normalized bhavdata table.
///
/// Values other than the date are kept as written upstream (trimmed); missing
/// values are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Security symbol.
    pub symbol: String,
    /// Trade date as `YYYYMMDD`, or `None` if the source date did not parse.
    pub trade_date: Option<String>,
    /// Opening price.
    pub open: Option<String>,
    /// Day high.
    pub high: Option<String>,
    /// Day low.
    pub low: Option<String>,
    /// Closing price.
    pub close: Option<String>,
    /// Deliverable quantity.
    pub deliverable_qty: Option<String>,
}

/// Number of columns in a normalized table.
pub const NORMALIZED_WIDTH: usize = 7;

impl NormalizedRecord {
    /// Reads every row of a normalized CSV file.
    pub fn read_file(path: &Path) -> Result<Vec<Self>> {
        let bytes = std::fs::read(path)?;
        Self::from_frame(&read_table(&bytes)?)
    }

    /// Reads every row of a normalized 7-column table.
    pub fn from_frame(frame: &DataFrame) -> Result<Vec<Self>> {
        if frame.width() != NORMALIZED_WIDTH {
            return Err(BhavError::Parse(format!(
                "normalized table has {} columns, expected {NORMALIZED_WIDTH}",
                frame.width()
            )));
        }

        let columns = frame
            .get_columns()
            .iter()
            .map(|c| {
                c.as_materialized_series()
                    .cast(&DataType::String)
                    .map_err(|e| BhavError::Parse(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let columns = columns
            .iter()
            .map(|s| s.str().map_err(|e| BhavError::Parse(e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        let value = |col: usize, row: usize| {
            columns[col]
                .get(row)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok((0..frame.height())
            .map(|row| Self {
                symbol: value(0, row).unwrap_or_default(),
                trade_date: value(1, row),
                open: value(2, row),
                high: value(3, row),
                low: value(4, row),
                close: value(5, row),
                deliverable_qty: value(6, row),
            })
            .collect())
    }
}
