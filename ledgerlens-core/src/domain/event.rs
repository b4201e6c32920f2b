//! Deal events: raw rows from the broker export and their enriched form.

use super::record::Record;
use super::row::Row;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A single deal as ingested. Every field stays a string; numeric and time
/// interpretation is left to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventRecord {
    pub event_id: String,
    pub account_id: String,
    pub position_id: String,
    pub trade_date_vn: String,
    pub open_time_vn: String,
    pub close_time_vn: String,
    pub action: String,
    pub symbol: String,
    pub lots: String,
    pub close_price: String,
    pub profit: String,
    pub event_type: String,
}

impl RawEventRecord {
    pub const FIELDS: [&'static str; 12] = [
        "event_id",
        "account_id",
        "position_id",
        "trade_date_vn",
        "open_time_vn",
        "close_time_vn",
        "action",
        "symbol",
        "lots",
        "close_price",
        "profit",
        "event_type",
    ];

    /// Build from a normalized row. Absent columns become empty strings.
    pub fn from_row(row: &Row) -> Self {
        Self {
            event_id: row.get("event_id").to_string(),
            account_id: row.get("account_id").to_string(),
            position_id: row.get("position_id").to_string(),
            trade_date_vn: row.get("trade_date_vn").to_string(),
            open_time_vn: row.get("open_time_vn").to_string(),
            close_time_vn: row.get("close_time_vn").to_string(),
            action: row.get("action").to_string(),
            symbol: row.get("symbol").to_string(),
            lots: row.get("lots").to_string(),
            close_price: row.get("close_price").to_string(),
            profit: row.get("profit").to_string(),
            event_type: row.get("event_type").to_string(),
        }
    }

    pub fn is_trade(&self) -> bool {
        self.event_type == "trade"
    }

    fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "event_id" => &self.event_id,
            "account_id" => &self.account_id,
            "position_id" => &self.position_id,
            "trade_date_vn" => &self.trade_date_vn,
            "open_time_vn" => &self.open_time_vn,
            "close_time_vn" => &self.close_time_vn,
            "action" => &self.action,
            "symbol" => &self.symbol,
            "lots" => &self.lots,
            "close_price" => &self.close_price,
            "profit" => &self.profit,
            "event_type" => &self.event_type,
            _ => return None,
        };
        Some(value.as_str())
    }
}

impl From<&Row> for RawEventRecord {
    fn from(row: &Row) -> Self {
        Self::from_row(row)
    }
}

impl AsRef<RawEventRecord> for RawEventRecord {
    fn as_ref(&self) -> &RawEventRecord {
        self
    }
}

impl Record for RawEventRecord {
    const NUMERIC_FIELDS: &'static [&'static str] =
        &["lots", "close_price", "profit", "event_id"];

    fn field(&self, name: &str) -> Cow<'_, str> {
        Cow::Borrowed(self.get(name).unwrap_or(""))
    }
}

/// Structural place of a deal inside its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealRole {
    Single,
    Entry,
    Exit,
    Adjustment,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl DealRole {
    /// Role of the deal at `rank` (0-based, ascending close time) in a group of `len`.
    pub fn for_rank(rank: usize, len: usize) -> Self {
        if len == 1 {
            DealRole::Single
        } else if rank == 0 {
            DealRole::Entry
        } else if rank + 1 == len {
            DealRole::Exit
        } else {
            DealRole::Adjustment
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DealRole::Single => "single",
            DealRole::Entry => "entry",
            DealRole::Exit => "exit",
            DealRole::Adjustment => "adjustment",
            DealRole::NotApplicable => "n/a",
        }
    }
}

impl fmt::Display for DealRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A raw event annotated with its role and its position's total PnL.
///
/// `position_pnl` is broadcast onto every member of the position so each row
/// is self-contained for consumers that never see the grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: RawEventRecord,
    pub deal_role: DealRole,
    pub position_pnl: String,
}

impl AsRef<RawEventRecord> for EnrichedEvent {
    fn as_ref(&self) -> &RawEventRecord {
        &self.event
    }
}

impl Record for EnrichedEvent {
    const NUMERIC_FIELDS: &'static [&'static str] =
        &["lots", "close_price", "position_pnl", "profit", "event_id"];

    fn field(&self, name: &str) -> Cow<'_, str> {
        match name {
            "deal_role" => Cow::Borrowed(self.deal_role.as_str()),
            "position_pnl" => Cow::Borrowed(self.position_pnl.as_str()),
            _ => self.event.field(name),
        }
    }
}
