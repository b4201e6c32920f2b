//! Dashboard configuration loaded from TOML with environment overrides.
//!
//! ```toml
//! [source]
//! api_base = "https://ledger.example.com"
//! api_token = "..."
//! summary_csv = "daily_summary_history.csv"
//! raw_events_csv = "raw_events_history.csv"
//!
//! [view]
//! page_size = 50
//! default_view = "position"
//! event_sort = { key = "close_time_vn", direction = "desc" }
//! position_sort = { key = "exit_time_vn", direction = "desc" }
//! ```
//!
//! Every field is optional; missing tables take their defaults.

use crate::session::DetailsView;
use ledgerlens_core::query::{SortSpec, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides `source.api_base`.
pub const ENV_API_BASE: &str = "LEDGERLENS_API_BASE";
/// Overrides `source.api_token`.
pub const ENV_API_TOKEN: &str = "LEDGERLENS_API_TOKEN";

pub const DEFAULT_SUMMARY_CSV: &str = "daily_summary_history.csv";
pub const DEFAULT_RAW_EVENTS_CSV: &str = "raw_events_history.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub source: SourceConfig,
    pub view: ViewConfig,
}

/// Where summary and raw-event rows come from.
///
/// A non-empty `api_base` selects the JSON API; otherwise the two CSV files
/// are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub api_base: Option<String>,
    pub api_token: Option<String>,
    pub summary_csv: PathBuf,
    pub raw_events_csv: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_token: None,
            summary_csv: PathBuf::from(DEFAULT_SUMMARY_CSV),
            raw_events_csv: PathBuf::from(DEFAULT_RAW_EVENTS_CSV),
        }
    }
}

impl SourceConfig {
    /// The API base with surrounding whitespace and trailing slashes removed,
    /// or `None` when unset or blank.
    pub fn api_base(&self) -> Option<&str> {
        self.api_base
            .as_deref()
            .map(|b| b.trim().trim_end_matches('/'))
            .filter(|b| !b.is_empty())
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Initial state of the details panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: usize,
    pub default_view: DetailsView,
    pub event_sort: SortSpec,
    pub position_sort: SortSpec,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            default_view: DetailsView::Position,
            event_sort: SortSpec::desc("close_time_vn"),
            position_sort: SortSpec::desc("exit_time_vn"),
        }
    }
}

impl LedgerConfig {
    /// Load a config file, or the defaults when `path` is `None`, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `LEDGERLENS_*` overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup(ENV_API_BASE) {
            tracing::debug!(env = ENV_API_BASE, "api base overridden from environment");
            self.source.api_base = Some(base);
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.source.api_token = Some(token);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view.page_size == 0 {
            return Err(ConfigError::Invalid("view.page_size must be at least 1".into()));
        }
        if self.view.event_sort.key.trim().is_empty()
            || self.view.position_sort.key.trim().is_empty()
        {
            return Err(ConfigError::Invalid("sort keys must not be empty".into()));
        }
        Ok(())
    }
}
