//! Sweep mode: normalize every CSV already sitting in the year folders.
//!
//! Running it twice is safe. Files normalized by the first pass are too narrow
//! for the source schema, so the second pass reports them and leaves them alone.

use std::path::{Path, PathBuf};

use bhav_core::{BhavError, Result, TransformReport, normalize_file};
use tracing::{info, warn};

/// Summary of a sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Files normalized in place.
    pub normalized: Vec<(PathBuf, TransformReport)>,
    /// Files left untouched and why.
    pub failed: Vec<(PathBuf, BhavError)>,
}

impl SweepReport {
    /// Number of CSV files visited.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.normalized.len() + self.failed.len()
    }
}

/// Normalizes every `*.csv` in each directory directly below `root`.
///
/// Files directly in `root` and deeper levels are ignored. Directories and
/// files are visited in name order. Only failing to list `root` is an error;
/// per-directory and per-file failures are recorded and skipped.
pub fn normalize_tree(root: &Path) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    for dir in sorted_entries(root)?.into_iter().filter(|p| p.is_dir()) {
        info!(dir = %dir.display(), "Processing folder");

        let files = match sorted_entries(&dir) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Could not list folder, skipping");
                continue;
            }
        };

        for file in files.into_iter().filter(|p| p.is_file() && is_csv(p)) {
            match normalize_file(&file) {
                Ok(summary) => {
                    info!(
                        path = %file.display(),
                        rows_retained = summary.rows_retained,
                        "Updated file saved"
                    );
                    report.normalized.push((file, summary));
                }
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping file");
                    report.failed.push((file, e));
                }
            }
        }
    }

    info!(
        root = %root.display(),
        normalized = report.normalized.len(),
        failed = report.failed.len(),
        "Sweep complete"
    );
    Ok(report)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
