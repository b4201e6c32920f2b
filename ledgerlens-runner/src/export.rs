//! Export: CSV for event and position selections and for reconciled daily
//! summaries, JSON for the analytics report.
//!
//! Read-only with respect to the sources: exports are built from whatever the
//! session currently selects.

use std::path::{Path, PathBuf};

use ledgerlens_core::analytics::AnalyticsReport;
use ledgerlens_core::domain::{DailySummaryRecord, EnrichedEvent, Position, RawEventRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub const POSITION_COLUMNS: [&str; 11] = [
    "trade_date_vn",
    "account_id",
    "position_id",
    "symbol",
    "entry_time_vn",
    "exit_time_vn",
    "entry_price",
    "exit_price",
    "lots",
    "deals_count",
    "position_pnl",
];

pub const SUMMARY_COLUMNS: [&str; 10] = [
    "trade_date_vn",
    "total_positions",
    "total_deals",
    "win_positions",
    "loss_positions",
    "net_profit",
    "gross_profit",
    "gross_loss",
    "total_deposit",
    "total_withdrawal",
];

// ─── CSV export ─────────────────────────────────────────────────────

/// Raw event columns followed by `deal_role` and `position_pnl`.
pub fn export_events_csv(events: &[EnrichedEvent]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = RawEventRecord::FIELDS.to_vec();
    header.extend(["deal_role", "position_pnl"]);
    wtr.write_record(&header)?;

    for e in events {
        let r = &e.event;
        wtr.write_record([
            r.event_id.as_str(),
            r.account_id.as_str(),
            r.position_id.as_str(),
            r.trade_date_vn.as_str(),
            r.open_time_vn.as_str(),
            r.close_time_vn.as_str(),
            r.action.as_str(),
            r.symbol.as_str(),
            r.lots.as_str(),
            r.close_price.as_str(),
            r.profit.as_str(),
            r.event_type.as_str(),
            e.deal_role.as_str(),
            e.position_pnl.as_str(),
        ])?;
    }

    finish(wtr)
}

pub fn export_positions_csv(positions: &[Position]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(POSITION_COLUMNS)?;

    for p in positions {
        wtr.write_record([
            &p.trade_date_vn,
            &p.account_id,
            &p.position_id,
            &p.symbol,
            &p.entry_time,
            &p.exit_time,
            &p.entry_price,
            &p.exit_price,
            &p.lots,
            &p.deals_count,
            &p.position_pnl,
        ])?;
    }

    finish(wtr)
}

pub fn export_summary_csv(days: &[DailySummaryRecord]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(SUMMARY_COLUMNS)?;

    for d in days {
        wtr.write_record([
            &d.trade_date_vn,
            &d.total_positions,
            &d.total_deals,
            &d.win_positions,
            &d.loss_positions,
            &d.net_profit,
            &d.gross_profit,
            &d.gross_loss,
            &d.total_deposit,
            &d.total_withdrawal,
        ])?;
    }

    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(data)?)
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_report_json(report: &AnalyticsReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write an export to disk, creating parent directories.
pub fn write_export(path: &Path, contents: &str) -> Result<(), ExportError> {
    let write_err = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, contents).map_err(write_err)?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "export written");
    Ok(())
}
