//! Analytics: KPIs, period rollups, and chart-ready series.
//!
//! Every function is pure: summary rows and/or deal events in, numbers out.
//! Calling them again with the same inputs yields the same outputs, so a
//! caller may recompute the whole panel on every filter change.
//!
//! Two trading-PnL formulas coexist. Per-day and monthly series
//! use `gross_profit + gross_loss` (loss already negative); the snapshot KPI
//! uses `gross_profit - |Σ gross_loss|`. They agree only while every
//! `gross_loss` is non-positive.

use crate::domain::{DailySummaryRecord, RawEventRecord};
use crate::normalize::{num, parse_timestamp};
use crate::query::in_date_range;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Symbols kept by [`symbol_breakdown`].
pub const TOP_SYMBOLS: usize = 10;

/// ISO weekday labels, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Label used when a trade has no symbol.
pub const UNKNOWN_SYMBOL: &str = "N/A";

// ─── Series types ───────────────────────────────────────────────────

/// Parallel arrays of category labels and values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    fn push(&mut self, label: impl Into<String>, value: f64) {
        self.labels.push(label.into());
        self.values.push(value);
    }
}

/// Deposit and withdrawal bars for a dual-axis chart. Withdrawals are `<= 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub labels: Vec<String>,
    pub deposits: Vec<f64>,
    pub withdrawals: Vec<f64>,
}

/// One trading day with its numeric columns coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: String,
    /// `gross_profit + gross_loss`.
    pub trade_pnl: f64,
    pub net: f64,
    pub deposit: f64,
    pub withdrawal: f64,
}

/// Summary rows as numeric points, ascending by `trade_date_vn` (stable).
pub fn daily_points(summary: &[DailySummaryRecord]) -> Vec<DailyPoint> {
    let mut days: Vec<&DailySummaryRecord> = summary.iter().collect();
    days.sort_by(|a, b| a.trade_date_vn.cmp(&b.trade_date_vn));
    days.into_iter()
        .map(|r| DailyPoint {
            date: r.trade_date_vn.clone(),
            trade_pnl: num(&r.gross_profit) + num(&r.gross_loss),
            net: num(&r.net_profit),
            deposit: num(&r.total_deposit),
            withdrawal: num(&r.total_withdrawal),
        })
        .collect()
}

// ─── Time series ────────────────────────────────────────────────────

/// Running sum of daily trade PnL, one value per day.
pub fn equity_curve(points: &[DailyPoint]) -> Series {
    let mut series = Series::default();
    let mut cum = 0.0;
    for p in points {
        cum += p.trade_pnl;
        series.push(p.date.as_str(), cum);
    }
    series
}

/// Distance below the running peak of the equity curve, reported `<= 0`.
///
/// The peak starts at zero, so an account that opens in the red is in
/// drawdown from its first day.
pub fn drawdown_curve(points: &[DailyPoint]) -> Series {
    let mut series = Series::default();
    let mut cum = 0.0_f64;
    let mut peak = 0.0_f64;
    for p in points {
        cum += p.trade_pnl;
        peak = peak.max(cum);
        series.push(p.date.as_str(), cum - peak);
    }
    series
}

pub fn cash_flow_bars(points: &[DailyPoint]) -> CashFlowSeries {
    let mut out = CashFlowSeries::default();
    for p in points {
        out.labels.push(p.date.clone());
        out.deposits.push(if p.deposit > 0.0 { p.deposit } else { 0.0 });
        out.withdrawals
            .push(if p.withdrawal > 0.0 { -p.withdrawal } else { 0.0 });
    }
    out
}

/// Trade PnL summed per `yyyy-mm`, months ascending.
pub fn monthly_rollup(points: &[DailyPoint]) -> Series {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    for p in points {
        let month: String = p.date.chars().take(7).collect();
        *months.entry(month).or_insert(0.0) += p.trade_pnl;
    }
    let mut series = Series::default();
    for (month, value) in months {
        series.push(month, value);
    }
    series
}

/// Net profit per summary row, in input order.
pub fn daily_net_series(summary: &[DailySummaryRecord]) -> Series {
    let mut series = Series::default();
    for r in summary {
        series.push(r.trade_date_vn.as_str(), num(&r.net_profit));
    }
    series
}

// ─── Categorical breakdowns ─────────────────────────────────────────

/// Trade profit per symbol, ranked by absolute value, top [`TOP_SYMBOLS`].
///
/// Ties keep first-seen order.
pub fn symbol_breakdown<E: AsRef<RawEventRecord>>(events: &[E]) -> Series {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<(&str, f64)> = Vec::new();

    for event in events.iter().map(AsRef::as_ref).filter(|e| e.is_trade()) {
        let symbol = if event.symbol.is_empty() {
            UNKNOWN_SYMBOL
        } else {
            event.symbol.as_str()
        };
        let slot = *index.entry(symbol).or_insert_with(|| {
            totals.push((symbol, 0.0));
            totals.len() - 1
        });
        totals[slot].1 += num(&event.profit);
    }

    totals.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    totals.truncate(TOP_SYMBOLS);

    let mut series = Series::default();
    for (symbol, value) in totals {
        series.push(symbol, value);
    }
    series
}

/// Trade profit per ISO weekday (Monday first) of the close time, falling
/// back to the open time. Trades with neither parsable are left out.
///
/// The weekday is taken from the wall-clock date in the timestamp's own
/// offset, i.e. the venue-local day.
pub fn weekday_breakdown<E: AsRef<RawEventRecord>>(events: &[E]) -> Series {
    let mut buckets = [0.0_f64; 7];
    for event in events.iter().map(AsRef::as_ref).filter(|e| e.is_trade()) {
        let when = parse_timestamp(&event.close_time_vn)
            .or_else(|| parse_timestamp(&event.open_time_vn));
        if let Some(dt) = when {
            buckets[dt.weekday().num_days_from_monday() as usize] += num(&event.profit);
        }
    }
    Series {
        labels: WEEKDAY_LABELS.iter().map(|s| s.to_string()).collect(),
        values: buckets.to_vec(),
    }
}

// ─── KPIs ───────────────────────────────────────────────────────────

/// Coerced column sums over a set of summary rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub net_profit: f64,
    pub positions: f64,
    pub deals: f64,
    pub wins: f64,
    pub losses: f64,
    pub deposits: f64,
    pub withdrawals: f64,
}

impl SummaryTotals {
    pub fn of<'a>(rows: impl IntoIterator<Item = &'a DailySummaryRecord>) -> Self {
        rows.into_iter().fold(Self::default(), |mut t, r| {
            t.gross_profit += num(&r.gross_profit);
            t.gross_loss += num(&r.gross_loss);
            t.net_profit += num(&r.net_profit);
            t.positions += num(&r.total_positions);
            t.deals += num(&r.total_deals);
            t.wins += num(&r.win_positions);
            t.losses += num(&r.loss_positions);
            t.deposits += num(&r.total_deposit);
            t.withdrawals += num(&r.total_withdrawal);
            t
        })
    }

    /// `wins / (wins + losses)`, `0` when there are neither.
    pub fn win_rate(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided > 0.0 {
            self.wins / decided
        } else {
            0.0
        }
    }
}

/// Headline numbers for the selected summary range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryKpis {
    /// `gross_profit + gross_loss`.
    pub trading_pnl: f64,
    pub net_pnl: f64,
    pub total_positions: f64,
    pub win_rate: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    /// Date of the last row in input order.
    pub latest_trade_date: Option<String>,
}

pub fn summary_kpis(summary: &[DailySummaryRecord]) -> SummaryKpis {
    let t = SummaryTotals::of(summary);
    SummaryKpis {
        trading_pnl: t.gross_profit + t.gross_loss,
        net_pnl: t.net_profit,
        total_positions: t.positions,
        win_rate: t.win_rate(),
        gross_profit: t.gross_profit,
        gross_loss: t.gross_loss,
        latest_trade_date: summary.last().map(|r| r.trade_date_vn.clone()),
    }
}

/// Account snapshot statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotKpis {
    pub gross_profit: f64,
    pub gross_loss_abs: f64,
    /// `gross_profit - gross_loss_abs`.
    pub trading_pnl: f64,
    pub deposits: f64,
    pub withdrawals: f64,
    /// `trading_pnl / deposits`, `0` without deposits.
    pub gain_pct: f64,
    /// Largest peak-to-trough fall of cumulative trade PnL, as a magnitude `>= 0`.
    pub max_drawdown: f64,
    /// `gross_profit / gross_loss_abs`, `0` without losses.
    pub profit_factor: f64,
}

pub fn snapshot_kpis(summary: &[DailySummaryRecord]) -> SnapshotKpis {
    let t = SummaryTotals::of(summary);
    let gross_loss_abs = t.gross_loss.abs();
    let trading_pnl = t.gross_profit - gross_loss_abs;

    SnapshotKpis {
        gross_profit: t.gross_profit,
        gross_loss_abs,
        trading_pnl,
        deposits: t.deposits,
        withdrawals: t.withdrawals,
        gain_pct: if t.deposits > 0.0 {
            trading_pnl / t.deposits
        } else {
            0.0
        },
        max_drawdown: max_drawdown(&daily_points(summary)),
        profit_factor: profit_factor(t.gross_profit, gross_loss_abs),
    }
}

/// Running-peak-minus-trough of cumulative trade PnL. Peak starts at zero.
pub fn max_drawdown(points: &[DailyPoint]) -> f64 {
    let mut cum = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for p in points {
        cum += p.trade_pnl;
        peak = peak.max(cum);
        max_dd = max_dd.max(peak - cum);
    }
    max_dd
}

/// `gross_profit / gross_loss_abs`; `0` when there is no loss.
pub fn profit_factor(gross_profit: f64, gross_loss_abs: f64) -> f64 {
    if gross_loss_abs > 0.0 {
        gross_profit / gross_loss_abs
    } else {
        0.0
    }
}

/// Summary table row, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTableRow {
    pub date: String,
    pub positions: f64,
    pub deals: f64,
    pub wins: f64,
    pub losses: f64,
    pub trade_pnl: f64,
    /// `deposit - withdrawal`.
    pub cash_flow: f64,
    pub net: f64,
}

pub fn summary_table(summary: &[DailySummaryRecord]) -> Vec<SummaryTableRow> {
    summary
        .iter()
        .rev()
        .map(|r| SummaryTableRow {
            date: r.trade_date_vn.clone(),
            positions: num(&r.total_positions),
            deals: num(&r.total_deals),
            wins: num(&r.win_positions),
            losses: num(&r.loss_positions),
            trade_pnl: num(&r.gross_profit) + num(&r.gross_loss),
            cash_flow: num(&r.total_deposit) - num(&r.total_withdrawal),
            net: num(&r.net_profit),
        })
        .collect()
}

// ─── Period rollups ─────────────────────────────────────────────────

/// Calendar windows ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Today,
        Period::ThisWeek,
        Period::ThisMonth,
        Period::ThisYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::ThisWeek => "This Week",
            Period::ThisMonth => "This Month",
            Period::ThisYear => "This Year",
        }
    }

    /// First day of the window. Weeks start on Monday.
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        match self {
            Period::Today => today,
            Period::ThisWeek => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            Period::ThisMonth => today - Duration::days(i64::from(today.day0())),
            Period::ThisYear => today - Duration::days(i64::from(today.ordinal0())),
        }
    }

    pub fn rollup(self, summary: &[DailySummaryRecord], today: NaiveDate) -> PeriodRollup {
        let from = self.start(today);
        let (lo, hi) = (from.to_string(), today.to_string());
        let t = SummaryTotals::of(
            summary
                .iter()
                .filter(|r| in_date_range(&r.trade_date_vn, Some(&lo), Some(&hi))),
        );
        PeriodRollup {
            period: self,
            from,
            to: today,
            trading_pnl: t.gross_profit + t.gross_loss,
            net_pnl: t.net_profit,
            win_rate: t.win_rate(),
            trades: t.deals,
            positions: t.positions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRollup {
    pub period: Period,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub trading_pnl: f64,
    pub net_pnl: f64,
    pub win_rate: f64,
    pub trades: f64,
    pub positions: f64,
}

/// Today, this week, this month, and this year, in that order.
pub fn period_rollups(summary: &[DailySummaryRecord], today: NaiveDate) -> Vec<PeriodRollup> {
    Period::ALL
        .iter()
        .map(|p| p.rollup(summary, today))
        .collect()
}

// ─── Report bundle ──────────────────────────────────────────────────

/// Every KPI and series of the analytics panel for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub kpis: SummaryKpis,
    pub snapshot: SnapshotKpis,
    pub daily_net: Series,
    pub equity: Series,
    pub drawdown: Series,
    pub cash_flow: CashFlowSeries,
    pub monthly: Series,
    pub symbols: Series,
    pub weekdays: Series,
    pub periods: Vec<PeriodRollup>,
    pub table: Vec<SummaryTableRow>,
}

impl AnalyticsReport {
    /// Build from already range-filtered summary rows and deal events.
    ///
    /// An empty `events` slice (raw data not loaded yet) only empties the
    /// symbol and weekday breakdowns.
    pub fn build<E: AsRef<RawEventRecord>>(
        summary: &[DailySummaryRecord],
        events: &[E],
        today: NaiveDate,
    ) -> Self {
        let points = daily_points(summary);
        Self {
            kpis: summary_kpis(summary),
            snapshot: snapshot_kpis(summary),
            daily_net: daily_net_series(summary),
            equity: equity_curve(&points),
            drawdown: drawdown_curve(&points),
            cash_flow: cash_flow_bars(&points),
            monthly: monthly_rollup(&points),
            symbols: symbol_breakdown(events),
            weekdays: weekday_breakdown(events),
            periods: period_rollups(summary, today),
            table: summary_table(summary),
        }
    }
}
