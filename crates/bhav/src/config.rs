//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bhav_core::{BhavError, Result, calendar::DEFAULT_WINDOW_DAYS};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`PipelineConfig::output_dir`].
pub const ENV_OUTPUT_DIR: &str = "BHAV_OUTPUT_DIR";
/// Environment variable overriding [`PipelineConfig::window_days`].
pub const ENV_WINDOW_DAYS: &str = "BHAV_WINDOW_DAYS";
/// Environment variable overriding [`PipelineConfig::pacing_ms`].
pub const ENV_PACING_MS: &str = "BHAV_PACING_MS";

/// Default pause between successive archive fetches.
const DEFAULT_PACING_MS: u64 = 2000;

/// Settings shared by the batch, single-date and sweep flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory files are written to; batch runs add a year level below it.
    pub output_dir: PathBuf,
    /// Length of the batch planning window, in days, ending today.
    pub window_days: u64,
    /// Pause between successive fetches, in milliseconds.
    pub pacing_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            window_days: DEFAULT_WINDOW_DAYS,
            pacing_ms: DEFAULT_PACING_MS,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `BHAV_OUTPUT_DIR`, `BHAV_WINDOW_DAYS` and `BHAV_PACING_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir.trim());
        }
        if let Some(days) = lookup(ENV_WINDOW_DAYS) {
            config.window_days = parse_number(ENV_WINDOW_DAYS, &days)?;
        }
        if let Some(ms) = lookup(ENV_PACING_MS) {
            config.pacing_ms = parse_number(ENV_PACING_MS, &ms)?;
        }

        Ok(config)
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the planning window length in days.
    #[must_use]
    pub const fn with_window_days(mut self, days: u64) -> Self {
        self.window_days = days;
        self
    }

    /// Set the pause between fetches.
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing_ms = pacing.as_millis() as u64;
        self
    }

    /// Pause between successive fetches.
    #[must_use]
    pub const fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| BhavError::InvalidParameter(format!("{name} must be a whole number, got {value:?}")))
}
