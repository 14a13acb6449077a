//! Single-date mode: fetch one day's file and normalize it in place.

use std::io::BufRead;
use std::path::PathBuf;

use bhav_core::{BhavError, DateKey, DocumentFetcher, Result, TransformReport, normalize_file};
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;

/// Message shown when interactive input is not a `DDMMYYYY` date.
pub const INVALID_DATE_MESSAGE: &str =
    "The date format is incorrect. Please enter the date as DDMMYYYY.";

/// Result of a single-date run.
#[derive(Debug, Clone)]
pub struct SingleOutcome {
    /// The normalized file.
    pub path: PathBuf,
    /// What the transform did.
    pub report: TransformReport,
}

/// Reads one line and parses it as a `DDMMYYYY` key.
///
/// Anything else, including end of input, is [`BhavError::UserInputInvalid`].
pub fn read_date_key<R: BufRead>(mut reader: R) -> Result<DateKey> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    DateKey::parse(&line).map_err(|e| {
        warn!(input = line.trim(), error = %e, "Rejected date input");
        BhavError::UserInputInvalid(INVALID_DATE_MESSAGE.to_string())
    })
}

/// Path of the single-date file: `<output>/sec_bhavdata_full_<DDMMYYYY>.csv`.
#[must_use]
pub fn single_path(config: &PipelineConfig, key: &DateKey) -> PathBuf {
    config.output_dir.join(key.file_name())
}

/// Bootstraps a session, fetches `key`, writes it to the output directory and
/// normalizes it in place.
///
/// Every failure is returned; when the transform fails the raw file is left on
/// disk as fetched.
#[instrument(skip(fetcher, config), fields(source = fetcher.name()))]
pub async fn fetch_single<F: DocumentFetcher>(
    fetcher: &F,
    config: &PipelineConfig,
    key: &DateKey,
) -> Result<SingleOutcome> {
    let session = fetcher.warm_session().await?;

    let bytes = fetcher.fetch(key, &session).await.inspect_err(|e| {
        warn!(error = %e, "Download failed");
    })?;

    tokio::fs::create_dir_all(&config.output_dir).await?;
    let path = single_path(config, key);
    tokio::fs::write(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "File downloaded");

    let report = normalize_file(&path).inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "Transform failed, raw file kept");
    })?;
    info!(
        path = %path.display(),
        rows_read = report.rows_read,
        rows_retained = report.rows_retained,
        "Modified file saved"
    );

    Ok(SingleOutcome { path, report })
}
