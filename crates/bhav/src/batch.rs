//! Batch mode: fetch and normalize every trading day of a window.
//!
//! Each planned date goes through
//! `Idle → Fetching → (Transforming | SkippedFetchFailed) → Done`. Dates are
//! processed strictly in ascending order, one at a time, with a fixed pause
//! between fetches. A failed date is logged and skipped; only a failed session
//! bootstrap ends the run.

use std::path::{Path, PathBuf};

use bhav_core::{
    BhavError, DateRange, DocumentFetcher, Result, TradingDate, TransformReport,
    plan_trading_dates, transform::normalize_file,
};
use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::{config::PipelineConfig, pacing::Pacer};

/// How one planned date ended.
#[derive(Debug)]
pub enum DateOutcome {
    /// Fetched, persisted and normalized in place.
    Normalized(TransformReport),
    /// The fetch failed; nothing was written.
    FetchFailed(BhavError),
    /// The fetched bytes could not be written to disk.
    WriteFailed(BhavError),
    /// The raw file was written but could not be normalized; it is left as fetched.
    TransformFailed(BhavError),
}

impl DateOutcome {
    /// Returns true if the date ended normalized.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Normalized(_))
    }

    /// The error that stopped this date, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&BhavError> {
        match self {
            Self::Normalized(_) => None,
            Self::FetchFailed(e) | Self::WriteFailed(e) | Self::TransformFailed(e) => Some(e),
        }
    }
}

/// Result for one planned date.
#[derive(Debug)]
pub struct DateResult {
    /// The planned trading date.
    pub date: TradingDate,
    /// Where the file for this date lives (or would have lived).
    pub path: PathBuf,
    /// What happened.
    pub outcome: DateOutcome,
}

/// Summary of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of distinct trading dates planned.
    pub planned: usize,
    /// Per-date results in processing order.
    pub results: Vec<DateResult>,
}

impl BatchReport {
    /// Number of dates fetched and normalized.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Number of dates skipped for any reason.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Results of skipped dates.
    pub fn failures(&self) -> impl Iterator<Item = &DateResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }
}

/// Runs the batch flow with a given fetcher.
#[derive(Debug)]
pub struct BatchRunner<F: DocumentFetcher> {
    fetcher: F,
    config: PipelineConfig,
}

impl<F: DocumentFetcher> BatchRunner<F> {
    /// Create a runner.
    #[must_use]
    pub const fn new(fetcher: F, config: PipelineConfig) -> Self {
        Self { fetcher, config }
    }

    /// The fetcher used by this runner.
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The configuration used by this runner.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Path of the persisted file for `date`: `<output>/<YYYY>/sec_bhavdata_full_<DDMMYYYY>.csv`.
    #[must_use]
    pub fn partition_path(&self, date: &TradingDate) -> PathBuf {
        self.partition_dir(date).join(date.key().file_name())
    }

    fn partition_dir(&self, date: &TradingDate) -> PathBuf {
        self.config.output_dir.join(format!("{:04}", date.year()))
    }

    /// Runs the configured trailing window ending at `today`.
    pub async fn run(&self, today: NaiveDate) -> Result<BatchReport> {
        self.run_window(DateRange::trailing(today, self.config.window_days))
            .await
    }

    /// Plans `window`, bootstraps a session and processes every planned date.
    ///
    /// Returns an error only if the session bootstrap fails.
    pub async fn run_window(&self, window: DateRange) -> Result<BatchReport> {
        let plan = plan_trading_dates(window.start, window.end);
        info!(
            planned = plan.len(),
            start = %window.start,
            end = %window.end,
            "Planned unique trading dates"
        );

        let session = self.fetcher.warm_session().await?;

        let mut pacer = Pacer::new(self.config.pacing());
        let mut report = BatchReport {
            planned: plan.len(),
            results: Vec::with_capacity(plan.len()),
        };

        for date in &plan {
            pacer.wait().await;
            report.results.push(self.process_date(*date, &session).await);
        }

        info!(
            fetcher = self.fetcher.name(),
            planned = report.planned,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch complete"
        );
        Ok(report)
    }

    #[instrument(skip(self, session), fields(key = %date.key()))]
    async fn process_date(&self, date: TradingDate, session: &F::Session) -> DateResult {
        let key = date.key();
        let path = self.partition_path(&date);

        let outcome = match self.fetcher.fetch(&key, session).await {
            Err(e) => {
                warn!(error = %e, "Fetch failed, skipping date");
                DateOutcome::FetchFailed(e)
            }
            Ok(bytes) => match self.persist(&date, &path, &bytes).await {
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not write file, skipping date");
                    DateOutcome::WriteFailed(e)
                }
                Ok(()) => match normalize_file(&path) {
                    Ok(report) => {
                        info!(
                            path = %path.display(),
                            rows = report.rows_retained,
                            "Saved normalized file"
                        );
                        DateOutcome::Normalized(report)
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Transform failed, raw file kept");
                        DateOutcome::TransformFailed(e)
                    }
                },
            },
        };

        DateResult {
            date,
            path,
            outcome,
        }
    }

    async fn persist(&self, date: &TradingDate, path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = self.partition_dir(date);
        let existed = dir.is_dir();
        tokio::fs::create_dir_all(&dir).await?;
        if !existed {
            info!(dir = %dir.display(), "Created directory for year {}", date.year());
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

#[cfg(feature = "nse")]
impl BatchRunner<bhav_nse::NseArchiveFetcher> {
    /// Create a runner backed by the public NSE archive.
    #[must_use]
    pub fn with_nse(config: PipelineConfig) -> Self {
        Self::new(bhav_nse::NseArchiveFetcher::new(), config)
    }
}
