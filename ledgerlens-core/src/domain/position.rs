//! Position: a reconstructed round trip built from its trade deals.

use super::record::Record;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Read-only aggregate over the trade deals sharing `(account_id, position_id)`.
///
/// Entry fields come from the earliest-closing deal, exit fields from the
/// latest. Numeric columns keep the string encoding of the source rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub trade_date_vn: String,
    pub account_id: String,
    pub position_id: String,
    pub symbol: String,
    pub entry_time: String,
    pub exit_time: String,
    pub entry_price: String,
    pub exit_price: String,
    pub lots: String,
    pub deals_count: String,
    pub position_pnl: String,
}

impl Record for Position {
    const NUMERIC_FIELDS: &'static [&'static str] = &[
        "entry_price",
        "exit_price",
        "lots",
        "deals_count",
        "position_pnl",
    ];

    fn field(&self, name: &str) -> Cow<'_, str> {
        let value = match name {
            "trade_date_vn" => &self.trade_date_vn,
            "account_id" => &self.account_id,
            "position_id" => &self.position_id,
            "symbol" => &self.symbol,
            "entry_time" | "entry_time_vn" => &self.entry_time,
            "exit_time" | "exit_time_vn" => &self.exit_time,
            "entry_price" => &self.entry_price,
            "exit_price" => &self.exit_price,
            "lots" => &self.lots,
            "deals_count" => &self.deals_count,
            "position_pnl" => &self.position_pnl,
            _ => return Cow::Borrowed(""),
        };
        Cow::Borrowed(value.as_str())
    }
}
