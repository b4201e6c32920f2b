//! DailySummaryRecord: one row per trading day from the summary source.

use super::record::Record;
use super::row::Row;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Day-level aggregates. `gross_loss` is stored as a negative magnitude.
///
/// `trade_date_vn` is unique within a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummaryRecord {
    pub trade_date_vn: String,
    pub gross_profit: String,
    pub gross_loss: String,
    pub net_profit: String,
    pub total_positions: String,
    pub total_deals: String,
    pub win_positions: String,
    pub loss_positions: String,
    pub total_deposit: String,
    pub total_withdrawal: String,
}

impl DailySummaryRecord {
    pub fn from_row(row: &Row) -> Self {
        Self {
            trade_date_vn: row.get("trade_date_vn").to_string(),
            gross_profit: row.get("gross_profit").to_string(),
            gross_loss: row.get("gross_loss").to_string(),
            net_profit: row.get("net_profit").to_string(),
            total_positions: row.get("total_positions").to_string(),
            total_deals: row.get("total_deals").to_string(),
            win_positions: row.get("win_positions").to_string(),
            loss_positions: row.get("loss_positions").to_string(),
            total_deposit: row.get("total_deposit").to_string(),
            total_withdrawal: row.get("total_withdrawal").to_string(),
        }
    }
}

impl From<&Row> for DailySummaryRecord {
    fn from(row: &Row) -> Self {
        Self::from_row(row)
    }
}

impl Record for DailySummaryRecord {
    const NUMERIC_FIELDS: &'static [&'static str] = &[
        "gross_profit",
        "gross_loss",
        "net_profit",
        "total_positions",
        "total_deals",
        "win_positions",
        "loss_positions",
        "total_deposit",
        "total_withdrawal",
    ];

    fn field(&self, name: &str) -> Cow<'_, str> {
        let value = match name {
            "trade_date_vn" => &self.trade_date_vn,
            "gross_profit" => &self.gross_profit,
            "gross_loss" => &self.gross_loss,
            "net_profit" => &self.net_profit,
            "total_positions" => &self.total_positions,
            "total_deals" => &self.total_deals,
            "win_positions" => &self.win_positions,
            "loss_positions" => &self.loss_positions,
            "total_deposit" => &self.total_deposit,
            "total_withdrawal" => &self.total_withdrawal,
            _ => return Cow::Borrowed(""),
        };
        Cow::Borrowed(value.as_str())
    }
}
