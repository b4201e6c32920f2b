//! LedgerLens Runner: ingestion boundary and dashboard session.
//!
//! This crate builds on `ledgerlens-core` to provide:
//! - TOML configuration with environment overrides
//! - Tabular sources (CSV files, bearer-authenticated JSON API)
//! - One-shot lazy raw-event loading with a memoized cache
//! - The dashboard session owning both details query contexts
//! - CSV / JSON export, including reconciled daily summaries

pub mod cache;
pub mod config;
pub mod export;
pub mod session;
pub mod source;

pub use cache::{LoadOutcome, RawDataset, RawEventCache, VisibilityTrigger};
pub use config::{ConfigError, LedgerConfig, SourceConfig, ViewConfig};
pub use export::{
    export_events_csv, export_positions_csv, export_report_json, export_summary_csv, write_export,
    ExportError,
};
pub use session::{DashboardSession, DetailsPage, DetailsRows, DetailsView};
pub use source::{select_source, ApiSource, CsvFileSource, SourceError, TabularSource};
