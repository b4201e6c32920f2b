//! Tabular sources: where summary and raw-event rows come from.
//!
//! Two transports deliver the same row shapes:
//! - [`CsvFileSource`]: `daily_summary_history.csv` / `raw_events_history.csv`
//! - [`ApiSource`]: `GET {base}/api/summary` and `GET {base}/api/raw-events`,
//!   each answering `{ "rows": [...] }`, optionally bearer-authenticated
//!
//! Sources only fetch and normalize. Reconstruction and caching sit above
//! this trait.

use crate::config::SourceConfig;
use ledgerlens_core::normalize::{parse_csv, parse_rows_envelope, EnvelopeError};
use ledgerlens_core::Row;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const SUMMARY_ENDPOINT: &str = "/api/summary";
pub const RAW_EVENTS_ENDPOINT: &str = "/api/raw-events";

/// Fetch failures, displayable as a single message to the caller.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("invalid response from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: EnvelopeError,
    },

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// A transport delivering summary and raw-event rows.
pub trait TabularSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn fetch_summary(&self) -> Result<Vec<Row>, SourceError>;

    fn fetch_raw_events(&self) -> Result<Vec<Row>, SourceError>;
}

// ─── CSV files ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CsvFileSource {
    summary_path: PathBuf,
    raw_events_path: PathBuf,
}

impl CsvFileSource {
    pub fn new(summary_path: impl Into<PathBuf>, raw_events_path: impl Into<PathBuf>) -> Self {
        Self {
            summary_path: summary_path.into(),
            raw_events_path: raw_events_path.into(),
        }
    }

    /// Both files under `dir` with their conventional names.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join(crate::config::DEFAULT_SUMMARY_CSV),
            dir.join(crate::config::DEFAULT_RAW_EVENTS_CSV),
        )
    }

    fn read(path: &Path) -> Result<Vec<Row>, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rows = parse_csv(&text);
        tracing::debug!(path = %path.display(), rows = rows.len(), "read CSV source");
        Ok(rows)
    }
}

impl TabularSource for CsvFileSource {
    fn name(&self) -> &str {
        "csv_files"
    }

    fn fetch_summary(&self) -> Result<Vec<Row>, SourceError> {
        Self::read(&self.summary_path)
    }

    fn fetch_raw_events(&self) -> Result<Vec<Row>, SourceError> {
        Self::read(&self.raw_events_path)
    }
}

// ─── JSON API ───────────────────────────────────────────────────────

pub struct ApiSource {
    client: reqwest::blocking::Client,
    base: String,
    token: Option<String>,
}

impl ApiSource {
    pub fn new(base: &str, token: Option<&str>) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base: base.trim().trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn get_rows(&self, path: &str) -> Result<Vec<Row>, SourceError> {
        let url = self.endpoint(path);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().map_err(|e| SourceError::Network {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.text().map_err(|e| SourceError::Network {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let rows = parse_rows_envelope(&body)
            .map_err(|source| SourceError::InvalidResponse { url: url.clone(), source })?;
        tracing::debug!(%url, rows = rows.len(), "fetched API rows");
        Ok(rows)
    }
}

impl std::fmt::Debug for ApiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSource")
            .field("base", &self.base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TabularSource for ApiSource {
    fn name(&self) -> &str {
        "api"
    }

    fn fetch_summary(&self) -> Result<Vec<Row>, SourceError> {
        self.get_rows(SUMMARY_ENDPOINT)
    }

    fn fetch_raw_events(&self) -> Result<Vec<Row>, SourceError> {
        self.get_rows(RAW_EVENTS_ENDPOINT)
    }
}

/// The API when a base URL is configured, the CSV files otherwise.
pub fn select_source(config: &SourceConfig) -> Result<Box<dyn TabularSource>, SourceError> {
    match config.api_base() {
        Some(base) => {
            tracing::info!(base, authenticated = config.api_token().is_some(), "using API source");
            Ok(Box::new(ApiSource::new(base, config.api_token())?))
        }
        None => {
            tracing::info!(
                summary = %config.summary_csv.display(),
                raw_events = %config.raw_events_csv.display(),
                "using CSV file source"
            );
            Ok(Box::new(CsvFileSource::new(
                config.summary_csv.clone(),
                config.raw_events_csv.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_trailing_slashes_are_stripped() {
        let api = ApiSource::new("https://ledger.example.com//", None).unwrap();
        assert_eq!(api.base(), "https://ledger.example.com");
        assert_eq!(
            api.endpoint(RAW_EVENTS_ENDPOINT),
            "https://ledger.example.com/api/raw-events"
        );
    }

    #[test]
    fn debug_never_prints_the_token() {
        let api = ApiSource::new("http://x", Some("hunter2")).unwrap();
        let shown = format!("{api:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn selection_follows_config() {
        let csv = SourceConfig::default();
        assert_eq!(select_source(&csv).unwrap().name(), "csv_files");

        let api = SourceConfig {
            api_base: Some("http://localhost:8080/".into()),
            ..Default::default()
        };
        assert_eq!(select_source(&api).unwrap().name(), "api");
    }

    #[test]
    fn missing_csv_file_is_an_io_error() {
        let source = CsvFileSource::new("/nonexistent/summary.csv", "/nonexistent/raw.csv");
        assert!(matches!(
            source.fetch_summary(),
            Err(SourceError::Io { .. })
        ));
    }

    #[test]
    fn unreachable_api_is_a_network_error() {
        // port 9 (discard) on localhost is closed in test environments
        let api = ApiSource::new("http://127.0.0.1:9", None).unwrap();
        assert!(matches!(
            api.fetch_summary(),
            Err(SourceError::Network { .. })
        ));
    }
}
