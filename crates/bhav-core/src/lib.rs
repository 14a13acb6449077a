#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bhav/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and transforms for daily bhavdata files.
//!
//! This crate provides the pieces every flow shares:
//!
//! - [`plan_trading_dates`](calendar::plan_trading_dates) - Distinct trading dates of a window
//! - [`DateKey`](calendar::DateKey) - `DDMMYYYY` archive keys
//! - [`SourceSchema`](schema::SourceSchema) - Positional layout of the upstream file
//! - [`normalize`](transform::normalize) - Projection, equity filter and date normalization
//! - [`DocumentFetcher`](fetcher::DocumentFetcher) - Session-based archive access

/// Trading calendar and batch planning.
pub mod calendar;
/// Error types for bhavdata operations.
pub mod error;
/// Fetcher trait for archive access.
pub mod fetcher;
/// Typed view of normalized rows.
pub mod record;
/// Positional source schema.
pub mod schema;
/// Row/column transform.
pub mod transform;

// Re-export commonly used items at crate root
pub use calendar::{
    DateKey, DateRange, TradingDate, TradingDateSet, adjust, is_weekday, plan_trading_dates,
};
pub use error::{BhavError, Result};
pub use fetcher::DocumentFetcher;
pub use record::NormalizedRecord;
pub use schema::{ColumnRole, SourceColumn, SourceSchema};
pub use transform::{Normalized, TransformReport, normalize, normalize_bytes, normalize_file};
