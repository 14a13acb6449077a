#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/bhav/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! NSE archive fetcher.
//!
//! This crate provides [`NseArchiveFetcher`], an implementation of the
//! [`DocumentFetcher`] trait from `bhav-core` that downloads
//! `sec_bhavdata_full_<DDMMYYYY>.csv` from the NSE public archive.
//!
//! # Session bootstrap
//!
//! The archive only serves real content to clients that first visited the NSE
//! landing page. [`NseArchiveFetcher::warm_session`] performs that visit with a
//! browser-like identity, keeps the returned cookies in a jar owned by the
//! returned [`NseSession`], and every later fetch sends a `Referer` pointing at
//! the reports page.
//!
//! # Example
//!
//! ```no_run
//! use bhav_core::{DateKey, DocumentFetcher};
//! use bhav_nse::NseArchiveFetcher;
//!
//! # async fn example() -> bhav_core::Result<()> {
//! let fetcher = NseArchiveFetcher::new();
//! let session = fetcher.warm_session().await?;
//! let key = DateKey::parse("05012024")?;
//!
//! let bytes = fetcher.fetch(&key, &session).await?;
//! println!("Fetched {} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bhav_core::{BhavError, DateKey, DocumentFetcher, Result};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use tokio::time::sleep;
use tracing::{debug, info};

/// NSE landing page visited to establish session cookies.
const HOME_URL: &str = "https://www.nseindia.com";

/// Reports page sent as `Referer` on archive requests.
const REFERER_URL: &str = "https://www.nseindia.com/all-reports";

/// Directory of the daily archive files.
const ARCHIVE_URL: &str = "https://nsearchives.nseindia.com/products/content";

/// Browser identity sent with every request.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36";

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Pause after the landing page visit before the first archive request.
const DEFAULT_WARMUP_DELAY_MS: u64 = 1000;

/// Per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// An established NSE session.
///
/// Owns the HTTP client whose cookie jar holds the cookies set by the landing
/// page. Dropping it discards the session.
#[derive(Debug, Clone)]
pub struct NseSession {
    client: reqwest::Client,
    referer: String,
    established_at: DateTime<Utc>,
}

impl NseSession {
    /// When the bootstrap request succeeded.
    #[must_use]
    pub const fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    /// Time elapsed since the bootstrap request succeeded.
    #[must_use]
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.established_at()
    }

    /// `Referer` sent on archive requests.
    #[must_use]
    pub fn referer(&self) -> &str {
        &self.referer
    }
}

/// NSE archive fetcher.
///
/// Implements [`DocumentFetcher`] with [`NseSession`] as its session type.
#[derive(Debug, Clone)]
pub struct NseArchiveFetcher {
    home_url: String,
    archive_url: String,
    referer: String,
    warmup_delay: Duration,
    timeout: Duration,
}

impl NseArchiveFetcher {
    /// Create a fetcher for the public NSE endpoints with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            home_url: HOME_URL.to_string(),
            archive_url: ARCHIVE_URL.to_string(),
            referer: REFERER_URL.to_string(),
            warmup_delay: Duration::from_millis(DEFAULT_WARMUP_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Use different landing page and archive locations (mirrors, test servers).
    #[must_use]
    pub fn with_base_urls(mut self, home_url: &str, archive_url: &str) -> Self {
        self.home_url = home_url.trim_end_matches('/').to_string();
        self.archive_url = archive_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the `Referer` sent on archive requests.
    #[must_use]
    pub fn with_referer(mut self, referer: &str) -> Self {
        self.referer = referer.to_string();
        self
    }

    /// Set the pause between the landing page visit and the first fetch.
    #[must_use]
    pub const fn with_warmup_delay(mut self, delay: Duration) -> Self {
        self.warmup_delay = delay;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the archive URL for a key.
    #[must_use]
    pub fn build_url(&self, key: &DateKey) -> String {
        format!("{}/{}", self.archive_url, key.file_name())
    }

    /// Host part of the landing page URL, for error reporting.
    fn home_host(&self) -> &str {
        self.home_url
            .split_once("://")
            .map_or(self.home_url.as_str(), |(_, rest)| rest)
            .split('/')
            .next()
            .unwrap_or_default()
    }

    fn build_client(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(self.timeout)
            .build()
            .map_err(|e| BhavError::InvalidParameter(format!("HTTP client: {e}")))
    }
}

impl Default for NseArchiveFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentFetcher for NseArchiveFetcher {
    type Session = NseSession;

    fn name(&self) -> &str {
        "NSE archives"
    }

    async fn warm_session(&self) -> Result<NseSession> {
        let client = self.build_client()?;
        let host_error = |reason: String| BhavError::HostUnreachable {
            host: self.home_host().to_string(),
            reason,
        };

        info!(url = %self.home_url, "Accessing NSE homepage to establish session");
        let response = client
            .get(&self.home_url)
            .send()
            .await
            .map_err(|e| host_error(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(host_error(format!("HTTP {}", response.status())));
        }

        if !self.warmup_delay.is_zero() {
            debug!("Warm-up: waiting {}ms", self.warmup_delay.as_millis());
            sleep(self.warmup_delay).await;
        }

        let session = NseSession {
            client,
            referer: self.referer.clone(),
            established_at: Utc::now(),
        };
        info!(established_at = %session.established_at(), "NSE session established");
        Ok(session)
    }

    async fn fetch(&self, key: &DateKey, session: &NseSession) -> Result<Vec<u8>> {
        let url = self.build_url(key);
        debug!(
            url = %url,
            session_age_secs = session.age().num_seconds(),
            "Fetching archive file"
        );

        let transient = |reason: String| BhavError::FetchTransient {
            key: key.to_string(),
            reason,
        };

        let response = session
            .client
            .get(&url)
            .header(REFERER, session.referer())
            .send()
            .await
            .map_err(|e| transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BhavError::FetchNotFound {
                key: key.to_string(),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(transient("rate limited (HTTP 429)".to_string()));
        }

        if !status.is_success() {
            return Err(transient(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transient(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
