//! Property tests for reconstruction and query invariants.
//!
//! Uses proptest to verify:
//! 1. Position PnL: every grouped event carries its group's profit sum
//! 2. Role counts: each group with two or more deals has exactly one entry and one exit
//! 3. Pagination: the served page is always within `[1, page_count]`
//! 4. Determinism: enrichment, the filter → sort → paginate pipeline, and
//!    analytics are repeatable
//! 5. Reconciliation: rebuilt summaries have one row per trade date

use chrono::NaiveDate;
use ledgerlens_core::analytics::AnalyticsReport;
use ledgerlens_core::domain::{DailySummaryRecord, DealRole, RawEventRecord};
use ledgerlens_core::normalize::{num, parse_timestamp};
use ledgerlens_core::query::{page_count, paginate, FilterSet, QueryEngine, SortDirection, SortSpec};
use ledgerlens_core::reconcile::{merge_summaries, summarize_days};
use ledgerlens_core::reconstruct::{build_positions, enrich_events};
use proptest::prelude::*;
use std::collections::HashMap;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_event() -> impl Strategy<Value = RawEventRecord> {
    (
        prop::sample::select(vec!["A1", "A2"]),
        prop::sample::select(vec!["", "p1", "p2", " p1 ", "p3"]),
        0u32..6,
        -500i32..500,
        prop::sample::select(vec!["trade", "deposit"]),
    )
        .prop_map(|(account, position, minute, cents, kind)| RawEventRecord {
            account_id: account.into(),
            position_id: position.into(),
            trade_date_vn: "2024-03-01".into(),
            close_time_vn: format!("2024-03-01T10:{minute:02}:00+07:00"),
            symbol: "XAUUSD".into(),
            // whole cents keep float sums exact enough for equality
            profit: format!("{}", f64::from(cents) / 4.0),
            event_type: kind.into(),
            ..Default::default()
        })
}

fn arb_listed_event() -> impl Strategy<Value = RawEventRecord> {
    (
        arb_event(),
        prop::sample::select(vec!["", "bad", "2024-03-01T09:15:00", "2024-03-02 08:00:00"]),
        prop::sample::select(vec!["XAUUSD", "EURUSD", "btcusd", ""]),
        prop::sample::select(vec!["Buy", "Sell"]),
        0u32..4,
    )
        .prop_map(|(mut e, odd_time, symbol, action, pick)| {
            if pick == 0 {
                e.close_time_vn = odd_time.into();
            }
            e.symbol = symbol.into();
            e.action = action.into();
            e.lots = format!("0.{pick}");
            e
        })
}

fn arb_sort() -> impl Strategy<Value = SortSpec> {
    (
        prop::sample::select(vec!["close_time_vn", "symbol", "lots", "position_pnl", "action"]),
        prop::bool::ANY,
    )
        .prop_map(|(key, desc)| {
            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            SortSpec::new(key, direction)
        })
}

fn arb_day() -> impl Strategy<Value = DailySummaryRecord> {
    (1u32..29, -100i32..100, -100i32..1).prop_map(|(d, gp, gl)| DailySummaryRecord {
        trade_date_vn: format!("2024-02-{d:02}"),
        gross_profit: gp.to_string(),
        gross_loss: gl.to_string(),
        net_profit: (gp + gl).to_string(),
        ..Default::default()
    })
}

fn group_key(e: &RawEventRecord) -> (String, String) {
    (e.account_id.clone(), e.position_id.trim().to_string())
}

// ── 1. Position PnL ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn grouped_events_share_group_profit(raw in prop::collection::vec(arb_event(), 0..40)) {
        let mut sums: HashMap<(String, String), f64> = HashMap::new();
        for e in raw.iter().filter(|e| !e.position_id.trim().is_empty()) {
            *sums.entry(group_key(e)).or_insert(0.0) += num(&e.profit);
        }

        let enriched = enrich_events(raw.clone());
        prop_assert_eq!(enriched.len(), raw.len());
        for e in &enriched {
            if e.event.position_id.trim().is_empty() {
                prop_assert_eq!(e.deal_role, DealRole::NotApplicable);
                prop_assert_eq!(num(&e.position_pnl), num(&e.event.profit));
            } else {
                let expected = sums[&group_key(&e.event)];
                prop_assert!((num(&e.position_pnl) - expected).abs() < 1e-9);
            }
        }
    }

    // ── 2. Role counts ───────────────────────────────────────────────

    #[test]
    fn one_entry_and_one_exit_per_multi_deal_group(
        raw in prop::collection::vec(arb_event(), 0..40),
    ) {
        let enriched = enrich_events(raw);
        let mut roles: HashMap<(String, String), Vec<DealRole>> = HashMap::new();
        for e in enriched.iter().filter(|e| !e.event.position_id.trim().is_empty()) {
            roles.entry(group_key(&e.event)).or_default().push(e.deal_role);
        }
        for group in roles.values() {
            let count = |role| group.iter().filter(|r| **r == role).count();
            if group.len() == 1 {
                prop_assert_eq!(group[0], DealRole::Single);
            } else {
                prop_assert_eq!(count(DealRole::Entry), 1);
                prop_assert_eq!(count(DealRole::Exit), 1);
                prop_assert_eq!(count(DealRole::Adjustment), group.len() - 2);
            }
        }
    }

    #[test]
    fn positions_only_count_trades(raw in prop::collection::vec(arb_event(), 0..40)) {
        let enriched = enrich_events(raw.clone());
        let positions = build_positions(&enriched);
        let trade_deals = raw
            .iter()
            .filter(|e| e.is_trade() && !e.position_id.trim().is_empty())
            .count();
        let counted: f64 = positions.iter().map(|p| num(&p.deals_count)).sum();
        prop_assert_eq!(counted as usize, trade_deals);
    }

    // ── 3. Pagination ────────────────────────────────────────────────

    #[test]
    fn served_page_is_clamped(total in 0usize..500, size in 1usize..80, requested in 0usize..50) {
        let rows: Vec<usize> = (0..total).collect();
        let page = paginate(&rows, size, requested);
        prop_assert!(page.page >= 1);
        prop_assert!(page.page <= page.page_count);
        prop_assert_eq!(page.page_count, page_count(total, size));
        prop_assert!(page.rows.len() <= size);
        prop_assert_eq!(page.total, total);
    }

    // ── 4. Determinism ───────────────────────────────────────────────

    #[test]
    fn enrichment_is_repeatable(raw in prop::collection::vec(arb_event(), 0..30)) {
        prop_assert_eq!(enrich_events(raw.clone()), enrich_events(raw));
    }

    #[test]
    fn drawdown_never_positive(days in prop::collection::vec(arb_day(), 0..40)) {
        let today = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let none: Vec<RawEventRecord> = Vec::new();
        let report = AnalyticsReport::build(&days, &none, today);
        prop_assert!(report.drawdown.values.iter().all(|v| *v <= 0.0));
        prop_assert!(report.snapshot.max_drawdown >= 0.0);
        let deepest = report.drawdown.values.iter().cloned().fold(0.0_f64, f64::min);
        prop_assert!((report.snapshot.max_drawdown + deepest).abs() < 1e-9);
    }

    #[test]
    fn details_pipeline_is_repeatable(
        raw in prop::collection::vec(arb_listed_event(), 0..120),
        sort in arb_sort(),
        symbol in prop::sample::select(vec!["", "usd", "XAU"]),
        size in 1usize..15,
        page in 0usize..20,
    ) {
        let events = enrich_events(raw);
        let mut engine = QueryEngine::new(sort, size);
        engine.set_filters(FilterSet::default().contains("symbol", symbol));
        engine.set_page(page);

        let first = engine.select(&events);
        let second = engine.select(&events);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(engine.view(&first), engine.view(&second));
    }

    #[test]
    fn unparsable_times_sort_last_descending(
        raw in prop::collection::vec(arb_listed_event(), 0..60),
    ) {
        let events = enrich_events(raw);
        let engine = QueryEngine::new(SortSpec::desc("close_time_vn"), 25);
        let selected = engine.select(&events);
        let parsed: Vec<bool> = selected
            .iter()
            .map(|e| parse_timestamp(&e.event.close_time_vn).is_some())
            .collect();
        let first_unparsed = parsed.iter().position(|p| !p).unwrap_or(parsed.len());
        prop_assert!(parsed[first_unparsed..].iter().all(|p| !p));
    }

    // ── 5. Reconciliation ────────────────────────────────────────────

    #[test]
    fn rebuilt_days_are_unique_and_merge_idempotently(
        raw in prop::collection::vec(arb_listed_event(), 0..60),
    ) {
        let days = summarize_days(&raw);
        prop_assert!(days.windows(2).all(|w| w[0].trade_date_vn < w[1].trade_date_vn));
        prop_assert_eq!(merge_summaries(&days, &days), days.clone());

        let net: f64 = raw.iter().map(|e| num(&e.profit)).sum();
        let rebuilt: f64 = days.iter().map(|d| num(&d.net_profit)).sum();
        prop_assert!((net - rebuilt).abs() < 1e-6);
    }
}
