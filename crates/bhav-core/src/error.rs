//! Error types for bhavdata operations.
//!
//! This module defines [`BhavError`] which covers every failure that can occur
//! while planning, fetching, transforming or persisting daily bhavdata files.

use thiserror::Error;

/// Errors that can occur while producing normalized bhavdata files.
#[derive(Error, Debug)]
pub enum BhavError {
    /// The session bootstrap request to the host's landing page failed.
    #[error("Host unreachable: {host}: {reason}")]
    HostUnreachable {
        /// The host that was contacted.
        host: String,
        /// Why the bootstrap failed.
        reason: String,
    },

    /// The archive has no file for the requested date.
    #[error("No archive file for {key}")]
    FetchNotFound {
        /// The `DDMMYYYY` key that was requested.
        key: String,
    },

    /// The fetch failed for a reason that may not repeat (network, HTTP 5xx, rate limit).
    #[error("Fetch failed for {key}: {reason}")]
    FetchTransient {
        /// The `DDMMYYYY` key that was requested.
        key: String,
        /// Description of the failure.
        reason: String,
    },

    /// The source table has fewer columns than the schema requires.
    #[error("Source has {found} columns, at least {required} required")]
    SchemaTooNarrow {
        /// Minimum column count required by the source schema.
        required: usize,
        /// Column count actually present.
        found: usize,
    },

    /// A date value could not be parsed.
    #[error("Date parse error: {0}")]
    DateParse(String),

    /// Interactive input was rejected.
    #[error("Invalid input: {0}")]
    UserInputInvalid(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading or writing tabular data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl BhavError {
    /// Returns true if a batch should log this error and move on to the next item.
    ///
    /// Only session bootstrap failures and rejected interactive input halt a run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::HostUnreachable { .. } | Self::UserInputInvalid(_)
        )
    }
}

/// Result type alias using [`BhavError`].
pub type Result<T> = std::result::Result<T, BhavError>;
