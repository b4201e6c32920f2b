//! Criterion benchmarks for LedgerLens hot paths.
//!
//! Benchmarks:
//! 1. Position reconstruction (enrich + build positions)
//! 2. Details query (filter, timestamp sort, paginate)
//! 3. Analytics report over a multi-year summary history

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ledgerlens_core::analytics::AnalyticsReport;
use ledgerlens_core::domain::{DailySummaryRecord, EnrichedEvent, RawEventRecord};
use ledgerlens_core::query::{DetailsFilter, QueryEngine, SortSpec};
use ledgerlens_core::reconstruct::{enrich_events, reconstruct};

// ── Helpers ──────────────────────────────────────────────────────────

const SYMBOLS: [&str; 5] = ["XAUUSD", "EURUSD", "GBPJPY", "BTCUSD", "US30"];

fn make_events(n: usize) -> Vec<RawEventRecord> {
    let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    (0..n)
        .map(|i| {
            let date = base + Duration::days((i / 40) as i64);
            let minute = i % 60;
            RawEventRecord {
                event_id: i.to_string(),
                account_id: format!("{}", 7000 + i % 3),
                position_id: format!("P{}", i / 3),
                trade_date_vn: date.to_string(),
                open_time_vn: format!("{date}T09:00:00+07:00"),
                close_time_vn: format!("{date}T10:{minute:02}:00+07:00"),
                action: if i % 2 == 0 { "Buy" } else { "Sell" }.into(),
                symbol: SYMBOLS[i % SYMBOLS.len()].into(),
                lots: "0.10".into(),
                close_price: format!("{:.2}", 100.0 + (i as f64 * 0.1).sin() * 10.0),
                profit: format!("{:.2}", (i as f64 * 0.37).cos() * 50.0),
                event_type: "trade".into(),
            }
        })
        .collect()
}

fn make_summary(days: usize) -> Vec<DailySummaryRecord> {
    let base = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..days)
        .map(|i| DailySummaryRecord {
            trade_date_vn: (base + Duration::days(i as i64)).to_string(),
            gross_profit: format!("{:.2}", 100.0 + (i as f64 * 0.2).sin() * 80.0),
            gross_loss: format!("{:.2}", -60.0 - (i as f64 * 0.3).cos() * 40.0),
            net_profit: format!("{:.2}", (i as f64 * 0.2).sin() * 50.0),
            total_positions: "4".into(),
            total_deals: "9".into(),
            win_positions: "2".into(),
            loss_positions: "2".into(),
            total_deposit: if i % 30 == 0 { "1000" } else { "0" }.into(),
            total_withdrawal: "0".into(),
        })
        .collect()
}

// ── 1. Reconstruction ────────────────────────────────────────────────

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");

    for &count in &[1_000, 10_000, 50_000] {
        let raw = make_events(count);
        group.bench_with_input(BenchmarkId::new("events", count), &count, |b, _| {
            b.iter(|| reconstruct(black_box(raw.clone())));
        });
    }

    group.finish();
}

// ── 2. Details query ─────────────────────────────────────────────────

fn bench_details_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("details_query");
    let events = enrich_events(make_events(20_000));

    let mut by_time: QueryEngine<EnrichedEvent> =
        QueryEngine::new(SortSpec::desc("close_time_vn"), 50);
    group.bench_function("sort_close_time_20k", |b| {
        b.iter(|| {
            let selected = by_time.select(black_box(&events));
            by_time.view(&selected).rows.len()
        });
    });

    by_time.set_filters(
        DetailsFilter {
            symbol: Some("usd".into()),
            action: Some("Buy".into()),
            ..Default::default()
        }
        .for_events(),
    );
    group.bench_function("filter_symbol_action_20k", |b| {
        b.iter(|| by_time.select(black_box(&events)).len());
    });

    let by_pnl: QueryEngine<EnrichedEvent> =
        QueryEngine::new(SortSpec::desc("position_pnl"), 50);
    group.bench_function("sort_numeric_20k", |b| {
        b.iter(|| by_pnl.select(black_box(&events)).len());
    });

    group.finish();
}

// ── 3. Analytics ─────────────────────────────────────────────────────

fn bench_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics");
    let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let events = enrich_events(make_events(10_000));

    for &days in &[252, 1260] {
        let summary = make_summary(days);
        group.bench_with_input(BenchmarkId::new("report", days), &days, |b, _| {
            b.iter(|| AnalyticsReport::build(black_box(&summary), black_box(&events), today));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconstruct, bench_details_query, bench_analytics);
criterion_main!(benches);
