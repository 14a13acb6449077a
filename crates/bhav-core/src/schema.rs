//! Positional source schema of the daily bhavdata file.
//!
//! The upstream file is addressed by column position, not header name. The
//! positions the transform relies on live here and nowhere else.

use serde::Serialize;

/// What a retained source column is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnRole {
    /// Security identifier.
    Symbol,
    /// Series/segment code; used for the equity filter, then dropped.
    Series,
    /// Trade date; normalized to `YYYYMMDD`.
    TradeDate,
    /// Passed through unchanged apart from trimming.
    Value,
}

/// One retained column of the source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SourceColumn {
    /// Zero-based position in the source file.
    pub position: usize,
    /// How the transform treats it.
    pub role: ColumnRole,
}

impl SourceColumn {
    const fn new(position: usize, role: ColumnRole) -> Self {
        Self { position, role }
    }
}

/// Ordered list of the source columns the transform keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SourceSchema {
    columns: &'static [SourceColumn],
    min_columns: usize,
    filter_token: &'static str,
}

/// Columns of `sec_bhavdata_full_<DDMMYYYY>.csv` that survive projection.
const BHAVDATA_COLUMNS: [SourceColumn; 8] = [
    SourceColumn::new(0, ColumnRole::Symbol),
    SourceColumn::new(1, ColumnRole::Series),
    SourceColumn::new(2, ColumnRole::TradeDate),
    // open, high, low, close, deliverable quantity
    SourceColumn::new(4, ColumnRole::Value),
    SourceColumn::new(5, ColumnRole::Value),
    SourceColumn::new(6, ColumnRole::Value),
    SourceColumn::new(8, ColumnRole::Value),
    SourceColumn::new(13, ColumnRole::Value),
];

impl SourceSchema {
    /// The NSE full bhavdata layout.
    ///
    /// Source width must be at least 14; positions 0, 1, 2, 4, 5, 6, 8 and 13 are
    /// kept; rows whose series contains `EQ` are retained.
    pub const BHAVDATA: Self = Self {
        columns: &BHAVDATA_COLUMNS,
        min_columns: 14,
        filter_token: "EQ",
    };

    /// Retained columns in projection order.
    #[must_use]
    pub const fn columns(&self) -> &'static [SourceColumn] {
        self.columns
    }

    /// Minimum number of columns a source file must have.
    #[must_use]
    pub const fn min_columns(&self) -> usize {
        self.min_columns
    }

    /// Upper-case substring a series value must contain for the row to be kept.
    #[must_use]
    pub const fn filter_token(&self) -> &'static str {
        self.filter_token
    }

    /// Source positions to project, in order.
    pub fn projection(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().map(|c| c.position)
    }

    /// Index within the projection of the first column with `role`.
    #[must_use]
    pub fn slot(&self, role: ColumnRole) -> Option<usize> {
        self.columns.iter().position(|c| c.role == role)
    }
}

impl Default for SourceSchema {
    fn default() -> Self {
        Self::BHAVDATA
    }
}
