#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bhav/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Download and normalize NSE daily bhavdata files.
//!
//! This crate re-exports the core types and the NSE fetcher, and provides the
//! three flows built on them:
//!
//! - [`BatchRunner`] - Every trading day of a trailing window, into year folders
//! - [`fetch_single`] - One day, into the output directory
//! - [`normalize_tree`] - Re-normalize files already on disk
//!
//! # Features
//!
//! - `nse` - NSE archive fetcher and the `bhav` binary (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use bhav::{BatchRunner, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> bhav::Result<()> {
//!     let runner = BatchRunner::with_nse(PipelineConfig::from_env()?);
//!     let report = runner.run(chrono::Local::now().date_naive()).await?;
//!     println!("{} of {} dates saved", report.succeeded(), report.planned);
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use bhav_core::*;

// Fetchers
#[cfg(feature = "nse")]
pub use bhav_nse::{NseArchiveFetcher, NseSession};

mod batch;
mod config;
mod pacing;
mod single;
mod sweep;

#[cfg(test)]
mod test_support;

pub use batch::{BatchReport, BatchRunner, DateOutcome, DateResult};
pub use config::{ENV_OUTPUT_DIR, ENV_PACING_MS, ENV_WINDOW_DAYS, PipelineConfig};
pub use single::{INVALID_DATE_MESSAGE, SingleOutcome, fetch_single, read_date_key, single_path};
pub use sweep::{SweepReport, normalize_tree};
