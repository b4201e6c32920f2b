//! Query engine: filter, sort, and paginate any homogeneous record collection.
//!
//! The free functions are pure and never mutate their input. [`QueryEngine`]
//! is the caller-owned query context (filters, sort, page) for one view; two
//! views are simply two engines.

use crate::domain::Record;
use crate::normalize::{num, parse_timestamp};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Default rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Field carrying the trading-day bucket on every record shape.
pub const DATE_FIELD: &str = "trade_date_vn";

// ─── Filtering ──────────────────────────────────────────────────────

/// A `field = value` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: String,
    pub value: String,
}

impl FieldMatch {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Conjunction of independently optional predicates.
///
/// An unset predicate, or one whose value is empty, imposes no constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Field the inclusive `from`/`to` bounds apply to.
    pub date_field: String,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Exact string matches.
    pub equals: Vec<FieldMatch>,
    /// Case-insensitive substring matches.
    pub contains: Vec<FieldMatch>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            date_field: DATE_FIELD.to_string(),
            from: None,
            to: None,
            equals: Vec::new(),
            contains: Vec::new(),
        }
    }
}

impl FilterSet {
    pub fn date_range(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.from = from.map(str::to_string);
        self.to = to.map(str::to_string);
        self
    }

    pub fn equals(mut self, field: &str, value: &str) -> Self {
        self.equals.push(FieldMatch::new(field, value));
        self
    }

    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.contains.push(FieldMatch::new(field, needle));
        self
    }

    pub fn matches<T: Record>(&self, record: &T) -> bool {
        let from = non_empty(self.from.as_deref());
        let to = non_empty(self.to.as_deref());
        if (from.is_some() || to.is_some())
            && !in_date_range(&record.field(&self.date_field), from, to)
        {
            return false;
        }

        let equals_ok = self
            .equals
            .iter()
            .filter(|m| !m.value.is_empty())
            .all(|m| record.field(&m.field) == m.value.as_str());
        if !equals_ok {
            return false;
        }

        self.contains
            .iter()
            .filter(|m| !m.value.trim().is_empty())
            .all(|m| {
                record
                    .field(&m.field)
                    .to_lowercase()
                    .contains(&m.value.trim().to_lowercase())
            })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Inclusive `[from, to]` check by lexicographic comparison.
///
/// Correct for zero-padded ISO `yyyy-mm-dd` dates. An empty date is never in
/// range.
pub fn in_date_range(date: &str, from: Option<&str>, to: Option<&str>) -> bool {
    if date.is_empty() {
        return false;
    }
    if let Some(from) = non_empty(from) {
        if date < from {
            return false;
        }
    }
    if let Some(to) = non_empty(to) {
        if date > to {
            return false;
        }
    }
    true
}

/// Records satisfying every predicate, in input order.
pub fn filter<T: Record + Clone>(records: &[T], filters: &FilterSet) -> Vec<T> {
    records
        .iter()
        .filter(|r| filters.matches(*r))
        .cloned()
        .collect()
}

/// The details-panel filter shared by the event and position views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsFilter {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Exact trading day.
    pub date: Option<String>,
    /// Exact deal action (`Buy`, `Sell`, ...). Events only.
    pub action: Option<String>,
    /// Case-insensitive symbol substring.
    pub symbol: Option<String>,
}

impl DetailsFilter {
    pub fn for_events(&self) -> FilterSet {
        let mut set = self.for_positions();
        if let Some(action) = &self.action {
            set = set.equals("action", action);
        }
        set
    }

    /// Same as [`Self::for_events`] minus `action`, which positions lack.
    pub fn for_positions(&self) -> FilterSet {
        let mut set = FilterSet::default().date_range(self.from.as_deref(), self.to.as_deref());
        if let Some(date) = &self.date {
            set = set.equals(DATE_FIELD, date);
        }
        if let Some(symbol) = &self.symbol {
            set = set.contains("symbol", symbol);
        }
        set
    }
}

/// Distinct non-empty trading days, newest first.
pub fn distinct_dates<T: Record>(records: &[T]) -> Vec<String> {
    let dates: BTreeSet<String> = records
        .iter()
        .map(|r| r.field(DATE_FIELD).into_owned())
        .filter(|d| !d.is_empty())
        .collect();
    dates.into_iter().rev().collect()
}

// ─── Sorting ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{other}' (expected asc or desc)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn asc(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Asc)
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Desc)
    }
}

/// Keys naming a time or date column compare as instants.
pub fn is_temporal_key(key: &str) -> bool {
    key.contains("time") || key.contains("date")
}

/// Comparable projection of one field. A single key always yields the same
/// variant across records.
#[derive(Debug, Clone)]
enum SortValue {
    Instant(Option<DateTime<FixedOffset>>),
    Number(f64),
    Text(String),
}

impl PartialEq for SortValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortValue {}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Instant(a), SortValue::Instant(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl SortValue {
    fn of<T: Record>(record: &T, key: &str) -> Self {
        let raw = record.field(key);
        if is_temporal_key(key) {
            SortValue::Instant(parse_timestamp(&raw))
        } else if T::is_numeric_field(key) {
            SortValue::Number(num(&raw))
        } else {
            SortValue::Text(raw.into_owned())
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortValue::Instant(_) => 0,
            SortValue::Number(_) => 1,
            SortValue::Text(_) => 2,
        }
    }
}

/// Stable sort in place.
///
/// Time/date keys compare parsed instants (unparsable first), declared numeric
/// keys compare numerically, everything else compares the raw string
/// case-sensitively. `Desc` reverses the comparator; equal keys keep their
/// prior relative order in both directions.
pub fn sort_in_place<T: Record>(records: &mut [T], spec: &SortSpec) {
    let key = spec.key.as_str();
    match spec.direction {
        SortDirection::Asc => records.sort_by_cached_key(|r| SortValue::of(r, key)),
        SortDirection::Desc => records.sort_by_cached_key(|r| Reverse(SortValue::of(r, key))),
    }
}

/// Sorted copy of `records`.
pub fn sort<T: Record + Clone>(records: &[T], spec: &SortSpec) -> Vec<T> {
    let mut out = records.to_vec();
    sort_in_place(&mut out, spec);
    out
}

// ─── Pagination ─────────────────────────────────────────────────────

/// `max(1, ceil(total / page_size))`. A zero page size counts as one.
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// One page of a collection with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a, T> {
    pub rows: &'a [T],
    /// Clamped 1-based page number.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
}

impl<T> Page<'_, T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

/// Slice out `page` (clamped into `[1, page_count]`).
pub fn paginate<T>(records: &[T], page_size: usize, page: usize) -> Page<'_, T> {
    let size = page_size.max(1);
    let total = records.len();
    let pages = page_count(total, size);
    let page = page.clamp(1, pages);
    let start = ((page - 1) * size).min(total);
    let end = (page * size).min(total);
    Page {
        rows: &records[start..end],
        page,
        page_count: pages,
        total,
    }
}

// ─── Query context ──────────────────────────────────────────────────

/// Caller-owned query state for one view over one record shape.
#[derive(Debug, Clone)]
pub struct QueryEngine<T> {
    filters: FilterSet,
    sort: SortSpec,
    page_size: usize,
    page: usize,
    _shape: PhantomData<fn() -> T>,
}

impl<T: Record + Clone> QueryEngine<T> {
    pub fn new(sort: SortSpec, page_size: usize) -> Self {
        Self {
            filters: FilterSet::default(),
            sort,
            page_size: page_size.max(1),
            page: 1,
            _shape: PhantomData,
        }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Replace the filter set and return to the first page.
    pub fn set_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
        self.page = 1;
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.page = 1;
    }

    /// Header-click semantics: the active key flips direction, a new key
    /// starts ascending.
    pub fn toggle_sort(&mut self, key: &str) {
        if self.sort.key == key {
            self.sort.direction = self.sort.direction.flipped();
        } else {
            self.sort = SortSpec::asc(key);
        }
        self.page = 1;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Like [`set_page`](Self::set_page), clamped to the pages `total` rows fill.
    pub fn set_page_within(&mut self, page: usize, total: usize) {
        self.page = page.clamp(1, page_count(total, self.page_size));
    }

    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    /// Advance one page if one exists. Returns whether the page changed.
    pub fn next_page(&mut self, total: usize) -> bool {
        let current = self.page.min(page_count(total, self.page_size));
        if current < page_count(total, self.page_size) {
            self.page = current + 1;
            true
        } else {
            self.page = current;
            false
        }
    }

    /// Go back one page if possible. Returns whether the page changed.
    pub fn prev_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Filter then sort.
    pub fn select(&self, records: &[T]) -> Vec<T> {
        let mut out = filter(records, &self.filters);
        sort_in_place(&mut out, &self.sort);
        out
    }

    /// Current page of an already selected collection.
    pub fn view<'a>(&self, selected: &'a [T]) -> Page<'a, T> {
        paginate(selected, self.page_size, self.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailySummaryRecord, Row};

    fn day(date: &str) -> DailySummaryRecord {
        DailySummaryRecord {
            trade_date_vn: date.into(),
            ..Default::default()
        }
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().copied().collect()
    }

    #[test]
    fn date_range_is_inclusive() {
        let rows = vec![day("2023-12-31"), day("2024-01-15"), day("2024-01-31"), day("2024-02-01")];
        let set = FilterSet::default().date_range(Some("2024-01-01"), Some("2024-01-31"));
        let dates: Vec<_> = filter(&rows, &set)
            .into_iter()
            .map(|d| d.trade_date_vn)
            .collect();
        assert_eq!(dates, vec!["2024-01-15", "2024-01-31"]);
    }

    #[test]
    fn empty_date_excluded_only_when_bounded() {
        let rows = vec![day(""), day("2024-01-15")];
        assert_eq!(filter(&rows, &FilterSet::default()).len(), 2);
        let set = FilterSet::default().date_range(Some("2024-01-01"), None);
        assert_eq!(filter(&rows, &set).len(), 1);
    }

    #[test]
    fn empty_predicates_are_unset() {
        let rows = vec![row(&[("action", "Buy")]), row(&[("action", "Sell")])];
        let set = FilterSet::default().equals("action", "").contains("symbol", "  ");
        assert_eq!(filter(&rows, &set).len(), 2);
    }

    #[test]
    fn contains_is_case_insensitive_and_missing_fields_are_empty() {
        let rows = vec![
            row(&[("symbol", "EURUSD")]),
            row(&[("symbol", "xauusd")]),
            row(&[("other", "x")]),
        ];
        let set = FilterSet::default().contains("symbol", " usd ");
        assert_eq!(filter(&rows, &set).len(), 2);
        let set = FilterSet::default().contains("symbol", "XAU");
        assert_eq!(filter(&rows, &set)[0].get("symbol"), "xauusd");
    }

    #[test]
    fn position_filter_ignores_action() {
        let details = DetailsFilter {
            action: Some("Buy".into()),
            symbol: Some("eur".into()),
            ..Default::default()
        };
        assert!(details.for_positions().equals.is_empty());
        assert_eq!(details.for_events().equals.len(), 1);
        assert_eq!(details.for_events().contains.len(), 1);
    }

    #[test]
    fn temporal_sort_desc_puts_unparsable_last() {
        let rows = vec![
            row(&[("close_time_vn", "2024-01-02T09:00:00Z")]),
            row(&[("close_time_vn", "n/a")]),
            row(&[("close_time_vn", "2024-01-02T11:00:00Z")]),
            row(&[("close_time_vn", "2024-01-02T10:00:00Z")]),
        ];
        let sorted = sort(&rows, &SortSpec::desc("close_time_vn"));
        let order: Vec<_> = sorted.iter().map(|r| r.get("close_time_vn")).collect();
        assert_eq!(
            order,
            vec![
                "2024-01-02T11:00:00Z",
                "2024-01-02T10:00:00Z",
                "2024-01-02T09:00:00Z",
                "n/a"
            ]
        );
        let sorted = sort(&rows, &SortSpec::asc("close_time_vn"));
        assert_eq!(sorted[0].get("close_time_vn"), "n/a");
    }

    #[test]
    fn numeric_keys_sort_numerically_others_lexicographically() {
        let mk = |p: &str| DailySummaryRecord {
            net_profit: p.into(),
            ..Default::default()
        };
        let rows = vec![mk("10"), mk("9"), mk("-2"), mk("1,000")];
        let sorted = sort(&rows, &SortSpec::asc("net_profit"));
        let order: Vec<_> = sorted.iter().map(|r| r.net_profit.as_str()).collect();
        assert_eq!(order, vec!["-2", "9", "10", "1,000"]);

        let rows = vec![
            row(&[("v", "10")]),
            row(&[("v", "9")]),
            row(&[("v", "B")]),
            row(&[("v", "a")]),
        ];
        let sorted = sort(&rows, &SortSpec::asc("v"));
        let order: Vec<_> = sorted.iter().map(|r| r.get("v")).collect();
        assert_eq!(order, vec!["10", "9", "B", "a"]);
    }

    #[test]
    fn equal_keys_keep_prior_order_in_both_directions() {
        let rows = vec![
            row(&[("k", "x"), ("id", "1")]),
            row(&[("k", "y"), ("id", "2")]),
            row(&[("k", "x"), ("id", "3")]),
        ];
        let ids = |v: Vec<Row>| v.iter().map(|r| r.get("id").to_string()).collect::<Vec<_>>();
        assert_eq!(ids(sort(&rows, &SortSpec::asc("k"))), vec!["1", "3", "2"]);
        assert_eq!(ids(sort(&rows, &SortSpec::desc("k"))), vec!["2", "1", "3"]);
    }

    #[test]
    fn pagination_clamps() {
        let rows: Vec<usize> = (0..120).collect();
        let p = paginate(&rows, 50, 5);
        assert_eq!(p.page_count, 3);
        assert_eq!(p.page, 3);
        assert_eq!(p.rows.len(), 20);
        assert_eq!(p.total, 120);
        assert!(!p.has_next());

        let p = paginate(&rows, 50, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.rows, &rows[..50]);
        assert!(!p.has_prev());
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let rows: Vec<u8> = Vec::new();
        let p = paginate(&rows, 50, 3);
        assert_eq!((p.page, p.page_count, p.total), (1, 1, 0));
        assert!(p.rows.is_empty());
    }

    #[test]
    fn engine_navigation_is_noop_past_bounds() {
        let mut engine: QueryEngine<Row> = QueryEngine::new(SortSpec::asc("k"), 50);
        assert!(!engine.prev_page());
        assert!(engine.next_page(120));
        assert!(engine.next_page(120));
        assert!(!engine.next_page(120));
        assert_eq!(engine.page(), 3);
        assert!(engine.prev_page());
        assert_eq!(engine.page(), 2);
    }

    #[test]
    fn engine_page_jump_clamps_to_selection() {
        let mut engine: QueryEngine<Row> = QueryEngine::new(SortSpec::asc("k"), 50);
        engine.set_page_within(10, 120);
        assert_eq!(engine.page(), 3);
        assert!(!engine.next_page(120));
        assert!(engine.prev_page());
        assert_eq!(engine.page(), 2);

        engine.set_page_within(0, 120);
        assert_eq!(engine.page(), 1);
        engine.set_page_within(7, 0);
        assert_eq!(engine.page(), 1);
    }

    #[test]
    fn engine_toggle_sort_flips_then_resets() {
        let mut engine: QueryEngine<Row> = QueryEngine::new(SortSpec::desc("close_time_vn"), 50);
        engine.set_page(4);
        engine.toggle_sort("close_time_vn");
        assert_eq!(engine.sort_spec(), &SortSpec::asc("close_time_vn"));
        assert_eq!(engine.page(), 1);
        engine.toggle_sort("symbol");
        assert_eq!(engine.sort_spec(), &SortSpec::asc("symbol"));
        engine.toggle_sort("symbol");
        assert_eq!(engine.sort_spec().direction, SortDirection::Desc);
    }

    #[test]
    fn distinct_dates_newest_first() {
        let rows = vec![day("2024-01-02"), day(""), day("2024-01-03"), day("2024-01-02")];
        assert_eq!(distinct_dates(&rows), vec!["2024-01-03", "2024-01-02"]);
    }

    #[test]
    fn direction_parses() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
