//! Reconciliation: rebuild daily summaries from deal events and merge
//! freshly extracted rows into an existing collection.

use crate::domain::{DailySummaryRecord, RawEventRecord, Record};
use crate::normalize::{format_number, num};
use crate::query::{sort_in_place, SortSpec};
use std::collections::{BTreeMap, HashMap};

/// Key that makes a daily summary unique within a collection.
pub const SUMMARY_KEY: &str = "trade_date_vn";

/// Key that makes a deal event unique within a collection.
pub const EVENT_KEY: &str = "event_id";

/// One [`DailySummaryRecord`] per `trade_date_vn`, ascending by date.
///
/// Gross profit and gross loss sum the positive and negative `profit` of
/// every event on the day. Win and loss positions count trade groups
/// `(account_id, position_id)` by the sign of their summed profit; a group
/// that nets to zero counts as neither. Withdrawals are reported as a
/// positive magnitude. Events without a trade date are skipped.
pub fn summarize_days(events: &[RawEventRecord]) -> Vec<DailySummaryRecord> {
    let mut by_day: BTreeMap<&str, Vec<&RawEventRecord>> = BTreeMap::new();
    let mut undated = 0usize;
    for event in events {
        if event.trade_date_vn.is_empty() {
            undated += 1;
            continue;
        }
        by_day.entry(&event.trade_date_vn).or_default().push(event);
    }
    if undated > 0 {
        tracing::warn!(undated, "events without trade_date_vn left out of daily summaries");
    }

    by_day
        .into_iter()
        .map(|(day, day_events)| summarize_day(day, &day_events))
        .collect()
}

fn summarize_day(day: &str, events: &[&RawEventRecord]) -> DailySummaryRecord {
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut net_profit = 0.0;
    let mut deposit = 0.0;
    let mut withdrawal = 0.0;
    let mut deals = 0usize;
    let mut position_pnl: HashMap<(&str, &str), f64> = HashMap::new();

    for event in events {
        let profit = num(&event.profit);
        net_profit += profit;
        if profit > 0.0 {
            gross_profit += profit;
        } else if profit < 0.0 {
            gross_loss += profit;
        }

        match event.event_type.as_str() {
            "trade" => {
                deals += 1;
                let position_id = event.position_id.trim();
                if !position_id.is_empty() {
                    *position_pnl
                        .entry((event.account_id.as_str(), position_id))
                        .or_insert(0.0) += profit;
                }
            }
            "deposit" => deposit += profit,
            "withdrawal" => withdrawal -= profit,
            _ => {}
        }
    }

    let wins = position_pnl.values().filter(|pnl| **pnl > 0.0).count();
    let losses = position_pnl.values().filter(|pnl| **pnl < 0.0).count();

    DailySummaryRecord {
        trade_date_vn: day.to_string(),
        gross_profit: format_number(gross_profit),
        gross_loss: format_number(gross_loss),
        net_profit: format_number(net_profit),
        total_positions: position_pnl.len().to_string(),
        total_deals: deals.to_string(),
        win_positions: wins.to_string(),
        loss_positions: losses.to_string(),
        total_deposit: format_number(deposit),
        total_withdrawal: format_number(withdrawal),
    }
}

/// Merge `incoming` over `existing`, de-duplicated on `key`.
///
/// A later row replaces an earlier one with the same key but keeps the
/// earlier row's slot, so ties under `order` fall back to first-seen order.
/// Rows with an empty key are dropped.
pub fn merge_by_key<T: Record + Clone>(
    existing: &[T],
    incoming: &[T],
    key: &str,
    order: &SortSpec,
) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(existing.len() + incoming.len());
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut replaced = 0usize;

    for row in existing.iter().chain(incoming) {
        let k = row.field(key);
        if k.is_empty() {
            continue;
        }
        match slots.get(k.as_ref()) {
            Some(&slot) => {
                merged[slot] = row.clone();
                replaced += 1;
            }
            None => {
                slots.insert(k.into_owned(), merged.len());
                merged.push(row.clone());
            }
        }
    }

    sort_in_place(&mut merged, order);
    tracing::debug!(key, rows = merged.len(), replaced, "merged rows");
    merged
}

/// Summaries keyed by trade date, oldest first.
pub fn merge_summaries(
    existing: &[DailySummaryRecord],
    incoming: &[DailySummaryRecord],
) -> Vec<DailySummaryRecord> {
    merge_by_key(existing, incoming, SUMMARY_KEY, &SortSpec::asc(SUMMARY_KEY))
}

/// Events keyed by `event_id`, most recent close first.
pub fn merge_events(
    existing: &[RawEventRecord],
    incoming: &[RawEventRecord],
) -> Vec<RawEventRecord> {
    merge_by_key(existing, incoming, EVENT_KEY, &SortSpec::desc("close_time_vn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, day: &str, position: &str, kind: &str, profit: &str) -> RawEventRecord {
        RawEventRecord {
            event_id: id.into(),
            account_id: "7001".into(),
            position_id: position.into(),
            trade_date_vn: day.into(),
            close_time_vn: format!("{day} 10:00:{id:0>2}"),
            event_type: kind.into(),
            profit: profit.into(),
            ..Default::default()
        }
    }

    #[test]
    fn days_fold_profit_and_cash_flows() {
        let events = vec![
            event("1", "2024-03-05", "P-1", "trade", "0"),
            event("2", "2024-03-05", "P-1", "trade", "120.5"),
            event("3", "2024-03-05", "P-2", "trade", "-40"),
            event("4", "2024-03-05", "", "deposit", "500"),
            event("5", "2024-03-04", "P-3", "trade", "10"),
            event("6", "2024-03-04", "", "withdrawal", "-200"),
        ];
        let days = summarize_days(&events);
        assert_eq!(days.len(), 2);

        let first = &days[0];
        assert_eq!(first.trade_date_vn, "2024-03-04");
        assert_eq!(first.gross_profit, "10");
        assert_eq!(first.gross_loss, "-200");
        assert_eq!(first.net_profit, "-190");
        assert_eq!(first.total_deposit, "0");
        assert_eq!(first.total_withdrawal, "200");
        assert_eq!(first.total_deals, "1");

        let second = &days[1];
        assert_eq!(second.gross_profit, "620.5");
        assert_eq!(second.gross_loss, "-40");
        assert_eq!(second.net_profit, "580.5");
        assert_eq!(second.total_positions, "2");
        assert_eq!(second.total_deals, "3");
        assert_eq!(second.win_positions, "1");
        assert_eq!(second.loss_positions, "1");
        assert_eq!(second.total_deposit, "500");
    }

    #[test]
    fn flat_positions_are_neither_wins_nor_losses() {
        let events = vec![
            event("1", "2024-03-05", "P-1", "trade", "25"),
            event("2", "2024-03-05", "P-1", "trade", "-25"),
        ];
        let day = &summarize_days(&events)[0];
        assert_eq!(day.total_positions, "1");
        assert_eq!(day.win_positions, "0");
        assert_eq!(day.loss_positions, "0");
    }

    #[test]
    fn same_position_id_on_two_accounts_counts_twice() {
        let mut other = event("2", "2024-03-05", "P-1", "trade", "-5");
        other.account_id = "7002".into();
        let events = vec![event("1", "2024-03-05", "P-1", "trade", "5"), other];
        let day = &summarize_days(&events)[0];
        assert_eq!(day.total_positions, "2");
        assert_eq!(day.win_positions, "1");
        assert_eq!(day.loss_positions, "1");
    }

    #[test]
    fn undated_events_are_skipped() {
        let events = vec![
            event("1", "", "P-1", "trade", "1000"),
            event("2", "2024-03-05", "P-2", "trade", "10"),
        ];
        let days = summarize_days(&events);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].net_profit, "10");
        assert!(summarize_days(&[]).is_empty());
    }

    #[test]
    fn merge_keeps_last_row_per_key_sorted_by_date() {
        let day = |date: &str, net: &str| DailySummaryRecord {
            trade_date_vn: date.into(),
            net_profit: net.into(),
            ..Default::default()
        };
        let existing = vec![day("2024-03-05", "1"), day("2024-03-03", "2"), day("", "9")];
        let incoming = vec![day("2024-03-04", "3"), day("2024-03-05", "4")];

        let merged = merge_summaries(&existing, &incoming);
        let got: Vec<_> = merged
            .iter()
            .map(|d| (d.trade_date_vn.as_str(), d.net_profit.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![("2024-03-03", "2"), ("2024-03-04", "3"), ("2024-03-05", "4")]
        );
    }

    #[test]
    fn merged_summaries_have_unique_dates() {
        let events = vec![
            event("1", "2024-03-05", "P-1", "trade", "5"),
            event("2", "2024-03-06", "P-2", "trade", "7"),
        ];
        let first = summarize_days(&events[..1]);
        let second = summarize_days(&events);
        let merged = merge_summaries(&first, &second);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged, second);
    }

    #[test]
    fn merged_events_are_newest_first() {
        let existing = vec![event("1", "2024-03-04", "P-1", "trade", "1")];
        let mut corrected = event("1", "2024-03-04", "P-1", "trade", "2");
        corrected.symbol = "XAUUSD".into();
        let incoming = vec![event("2", "2024-03-05", "P-2", "trade", "3"), corrected];

        let merged = merge_events(&existing, &incoming);
        let ids: Vec<_> = merged.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(merged[1].profit, "2");
        assert_eq!(merged[1].symbol, "XAUUSD");
    }
}
