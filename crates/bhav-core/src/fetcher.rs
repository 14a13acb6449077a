//! Fetcher trait for retrieving archive documents.
//!
//! A [`DocumentFetcher`] hands out an explicit session value from
//! [`DocumentFetcher::warm_session`] and requires it on every
//! [`DocumentFetcher::fetch`]. Nothing about the session lives in globals, so a
//! caller can hold several independent sessions at once.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{calendar::DateKey, error::Result};

/// Source of raw daily archive files keyed by `DDMMYYYY`.
///
/// Implementations report:
///
/// - [`BhavError::HostUnreachable`](crate::BhavError::HostUnreachable) from
///   `warm_session` when the bootstrap request fails,
/// - [`BhavError::FetchNotFound`](crate::BhavError::FetchNotFound) when the
///   archive has no file for the key (weekday holidays included),
/// - [`BhavError::FetchTransient`](crate::BhavError::FetchTransient) for any
///   other fetch failure.
#[async_trait]
pub trait DocumentFetcher: Send + Sync + Debug {
    /// Established session state (cookies, headers) threaded through fetches.
    type Session: Send + Sync;

    /// Returns the name of this fetcher (e.g., "NSE archives").
    fn name(&self) -> &str;

    /// Performs the bootstrap request and returns a usable session.
    async fn warm_session(&self) -> Result<Self::Session>;

    /// Fetches the raw file for `key` using an established session.
    async fn fetch(&self, key: &DateKey, session: &Self::Session) -> Result<Vec<u8>>;
}
