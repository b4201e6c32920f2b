//! LedgerLens Core: typed records, normalization, position reconstruction,
//! querying, and analytics for a trading ledger.
//!
//! Everything in this crate is pure and synchronous:
//! - Domain records (daily summaries, deal events, positions)
//! - Normalizer for CSV text and JSON row envelopes
//! - Position reconstruction from `(account_id, position_id)` groups
//! - Generic filter / sort / paginate engine over any [`domain::Record`]
//! - Analytics aggregator: KPIs, period rollups, chart-ready series
//! - Reconciliation: daily summaries rebuilt from events, keyed merges
//!
//! Fetching, caching, and configuration live in `ledgerlens-runner`.

pub mod analytics;
pub mod domain;
pub mod normalize;
pub mod query;
pub mod reconcile;
pub mod reconstruct;

pub use analytics::AnalyticsReport;
pub use domain::{
    DailySummaryRecord, DealRole, EnrichedEvent, Position, RawEventRecord, Record, Row,
};
pub use query::{DetailsFilter, FilterSet, QueryEngine, SortDirection, SortSpec};
pub use reconcile::{merge_by_key, summarize_days};
pub use reconstruct::{reconstruct, Reconstruction};
