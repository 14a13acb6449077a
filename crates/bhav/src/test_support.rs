//! In-memory fetcher and fixtures shared by the orchestration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bhav_core::{BhavError, DateKey, DocumentFetcher, Result};

const HEADER: &str = "SYMBOL, SERIES, DATE1, PREV_CLOSE, OPEN_PRICE, HIGH_PRICE, LOW_PRICE, \
                      LAST_PRICE, CLOSE_PRICE, AVG_PRICE, TTL_TRD_QNTY, TURNOVER_LACS, \
                      NO_OF_TRADES, DELIV_QTY, DELIV_PER";

/// A full-width bhavdata file with one equity and one bond row for `date`.
pub(crate) fn bhavdata_csv(date: &str) -> Vec<u8> {
    format!(
        "{HEADER}\n\
         RELIANCE, EQ, {date}, 2580.1, 2590.0, 2610.0, 2575.0, 2601.0, 2603.5, 2594.2, 512000, 13280.5, 40211, 250000, 48.83\n\
         GOI2033, GS, {date}, 99.1, 99.2, 99.4, 99.0, 99.3, 99.3, 99.2, 100, 0.1, 3, -, -\n"
    )
    .into_bytes()
}

/// A file too narrow for the bhavdata schema.
pub(crate) fn narrow_csv() -> Vec<u8> {
    b"SYMBOL,SERIES,DATE1,CLOSE\nRELIANCE,EQ,05-Jan-2024,2603.5\n".to_vec()
}

/// Fetcher serving canned bytes per key and recording every call.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    files: HashMap<String, Vec<u8>>,
    transient: HashSet<String>,
    refuse_session: bool,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_file(mut self, key: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(key.to_string(), bytes);
        self
    }

    pub(crate) fn with_transient(mut self, key: &str) -> Self {
        self.transient.insert(key.to_string());
        self
    }

    pub(crate) fn refusing_session(mut self) -> Self {
        self.refuse_session = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    type Session = ();

    fn name(&self) -> &str {
        "mock"
    }

    async fn warm_session(&self) -> Result<()> {
        if self.refuse_session {
            return Err(BhavError::HostUnreachable {
                host: "mock".to_string(),
                reason: "HTTP 403".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch(&self, key: &DateKey, _session: &()) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(key.to_string());

        if self.transient.contains(key.as_str()) {
            return Err(BhavError::FetchTransient {
                key: key.to_string(),
                reason: "connection reset".to_string(),
            });
        }

        self.files
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| BhavError::FetchNotFound {
                key: key.to_string(),
            })
    }
}
