//! Dashboard session: the caller-owned state behind one dashboard.
//!
//! Owns the summary rows, the lazily loaded raw-event cache, and two
//! independent query contexts (event view and position view). Summary
//! analytics never depend on the raw load succeeding: without raw data the
//! report simply has empty symbol and weekday breakdowns.

use crate::cache::{LoadOutcome, RawDataset, RawEventCache, VisibilityTrigger};
use crate::config::ViewConfig;
use crate::source::{SourceError, TabularSource};
use chrono::NaiveDate;
use ledgerlens_core::analytics::AnalyticsReport;
use ledgerlens_core::domain::{DailySummaryRecord, EnrichedEvent, Position, RawEventRecord};
use ledgerlens_core::query::{
    distinct_dates, in_date_range, DetailsFilter, FilterSet, Page, QueryEngine, SortSpec,
};
use ledgerlens_core::reconcile::{merge_summaries, summarize_days};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which record shape the details panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailsView {
    Event,
    #[default]
    Position,
}

impl fmt::Display for DetailsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailsView::Event => write!(f, "event"),
            DetailsView::Position => write!(f, "position"),
        }
    }
}

impl FromStr for DetailsView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "event" | "events" => Ok(DetailsView::Event),
            "position" | "positions" => Ok(DetailsView::Position),
            other => Err(format!("unknown view '{other}' (expected event or position)")),
        }
    }
}

/// Owned copy of one page, detached from the selection it was cut from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailsPage<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
}

impl<T: Clone> From<Page<'_, T>> for DetailsPage<T> {
    fn from(page: Page<'_, T>) -> Self {
        Self {
            rows: page.rows.to_vec(),
            page: page.page,
            page_count: page.page_count,
            total: page.total,
        }
    }
}

impl<T> DetailsPage<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum DetailsRows {
    Event(DetailsPage<EnrichedEvent>),
    Position(DetailsPage<Position>),
}

pub struct DashboardSession {
    source: Box<dyn TabularSource>,
    summary: Vec<DailySummaryRecord>,
    summary_range: FilterSet,
    raw: RawEventCache,
    details_trigger: VisibilityTrigger,
    details: DetailsFilter,
    events: QueryEngine<EnrichedEvent>,
    positions: QueryEngine<Position>,
    view: DetailsView,
}

impl fmt::Debug for DashboardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardSession")
            .field("source", &self.source.name())
            .field("summary_rows", &self.summary.len())
            .field("raw_loaded", &self.raw.is_loaded())
            .field("view", &self.view)
            .finish()
    }
}

impl DashboardSession {
    /// Fetch the summary eagerly. Raw events wait for first demand.
    ///
    /// Summary rows are ordered ascending by trade date (stable).
    pub fn open(source: Box<dyn TabularSource>, view: &ViewConfig) -> Result<Self, SourceError> {
        let rows = source.fetch_summary()?;
        let mut summary: Vec<DailySummaryRecord> =
            rows.iter().map(DailySummaryRecord::from_row).collect();
        summary.sort_by(|a, b| a.trade_date_vn.cmp(&b.trade_date_vn));
        tracing::info!(source = source.name(), days = summary.len(), "summary loaded");

        Ok(Self {
            source,
            summary,
            summary_range: FilterSet::default(),
            raw: RawEventCache::new(),
            details_trigger: VisibilityTrigger::new(),
            details: DetailsFilter::default(),
            events: QueryEngine::new(view.event_sort.clone(), view.page_size),
            positions: QueryEngine::new(view.position_sort.clone(), view.page_size),
            view: view.default_view,
        })
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    // ─── Summary panel ──────────────────────────────────────────────

    pub fn summary(&self) -> &[DailySummaryRecord] {
        &self.summary
    }

    /// Inclusive `yyyy-mm-dd` bounds; `None` or empty means unbounded.
    pub fn set_summary_range(&mut self, from: Option<&str>, to: Option<&str>) {
        self.summary_range = FilterSet::default().date_range(from, to);
    }

    pub fn summary_range(&self) -> (Option<&str>, Option<&str>) {
        (
            self.summary_range.from.as_deref(),
            self.summary_range.to.as_deref(),
        )
    }

    /// Summary rows inside the range. Rows without a trade date never are,
    /// even when the range is unbounded.
    pub fn summary_in_range(&self) -> Vec<DailySummaryRecord> {
        self.summary
            .iter()
            .filter(|day| self.in_summary_range(&day.trade_date_vn))
            .cloned()
            .collect()
    }

    fn in_summary_range(&self, date: &str) -> bool {
        let (from, to) = self.summary_range();
        in_date_range(date, from, to)
    }

    /// Analytics for the summary range. Raw events in the same range feed
    /// the symbol and weekday breakdowns once loaded.
    pub fn summary_report(&self, today: NaiveDate) -> AnalyticsReport {
        let rows = self.summary_in_range();
        let events: Vec<RawEventRecord> = match self.raw.get() {
            Some(data) => data
                .events
                .iter()
                .filter(|e| self.in_summary_range(&e.event.trade_date_vn))
                .map(|e| e.event.clone())
                .collect(),
            None => Vec::new(),
        };
        AnalyticsReport::build(&rows, &events, today)
    }

    // ─── Raw events ─────────────────────────────────────────────────

    /// Load raw events for analytics. A failure is returned but leaves the
    /// summary untouched.
    pub fn ensure_raw_loaded(&self) -> Result<LoadOutcome, SourceError> {
        self.raw.load(self.source.as_ref())
    }

    /// Feed a details-panel visibility signal. Returns `None` unless this
    /// signal started a load. A failed load re-arms the trigger.
    pub fn observe_details_visibility(
        &self,
        visible: bool,
    ) -> Option<Result<LoadOutcome, SourceError>> {
        if !self.details_trigger.observe(visible) {
            return None;
        }
        let result = self.ensure_raw_loaded();
        if result.is_err() {
            self.details_trigger.rearm();
        }
        Some(result)
    }

    pub fn raw(&self) -> Option<&RawDataset> {
        self.raw.get()
    }

    pub fn is_raw_loaded(&self) -> bool {
        self.raw.is_loaded()
    }

    /// Trading days present in the raw events, newest first.
    pub fn available_dates(&self) -> Vec<String> {
        self.raw
            .get()
            .map(|data| distinct_dates(&data.events))
            .unwrap_or_default()
    }

    /// Daily summaries rebuilt from the loaded raw events and merged over
    /// the source summary, one row per trade date. `None` before raw events
    /// load.
    pub fn reconciled_summary(&self) -> Option<Vec<DailySummaryRecord>> {
        let data = self.raw.get()?;
        let raw: Vec<RawEventRecord> = data.events.iter().map(|e| e.event.clone()).collect();
        let rebuilt = summarize_days(&raw);
        tracing::info!(
            source_days = self.summary.len(),
            rebuilt_days = rebuilt.len(),
            "daily summaries reconciled"
        );
        Some(merge_summaries(&self.summary, &rebuilt))
    }

    // ─── Details panel ──────────────────────────────────────────────

    pub fn view(&self) -> DetailsView {
        self.view
    }

    /// Switch the details panel and return to its first page.
    pub fn switch_view(&mut self, view: DetailsView) {
        self.view = view;
        match view {
            DetailsView::Event => self.events.reset_page(),
            DetailsView::Position => self.positions.reset_page(),
        }
    }

    pub fn details_filter(&self) -> &DetailsFilter {
        &self.details
    }

    /// Apply to both views. Positions ignore `action`.
    pub fn set_details_filter(&mut self, details: DetailsFilter) {
        self.events.set_filters(details.for_events());
        self.positions.set_filters(details.for_positions());
        self.details = details;
    }

    pub fn event_sort(&self) -> &SortSpec {
        self.events.sort_spec()
    }

    pub fn position_sort(&self) -> &SortSpec {
        self.positions.sort_spec()
    }

    pub fn set_event_sort(&mut self, sort: SortSpec) {
        self.events.set_sort(sort);
    }

    pub fn set_position_sort(&mut self, sort: SortSpec) {
        self.positions.set_sort(sort);
    }

    pub fn toggle_event_sort(&mut self, key: &str) {
        self.events.toggle_sort(key);
    }

    pub fn toggle_position_sort(&mut self, key: &str) {
        self.positions.toggle_sort(key);
    }

    pub fn selected_events(&self) -> Vec<EnrichedEvent> {
        self.raw
            .get()
            .map(|data| self.events.select(&data.events))
            .unwrap_or_default()
    }

    pub fn selected_positions(&self) -> Vec<Position> {
        self.raw
            .get()
            .map(|data| self.positions.select(&data.positions))
            .unwrap_or_default()
    }

    pub fn event_page(&self) -> Option<DetailsPage<EnrichedEvent>> {
        let data = self.raw.get()?;
        let selected = self.events.select(&data.events);
        Some(self.events.view(&selected).into())
    }

    pub fn position_page(&self) -> Option<DetailsPage<Position>> {
        let data = self.raw.get()?;
        let selected = self.positions.select(&data.positions);
        Some(self.positions.view(&selected).into())
    }

    /// The active view's current page, or `None` before raw events load.
    pub fn details_page(&self) -> Option<DetailsRows> {
        match self.view {
            DetailsView::Event => self.event_page().map(DetailsRows::Event),
            DetailsView::Position => self.position_page().map(DetailsRows::Position),
        }
    }

    fn active_total(&self) -> usize {
        match self.view {
            DetailsView::Event => self.selected_events().len(),
            DetailsView::Position => self.selected_positions().len(),
        }
    }

    pub fn page(&self) -> usize {
        match self.view {
            DetailsView::Event => self.events.page(),
            DetailsView::Position => self.positions.page(),
        }
    }

    /// Jump to `page`, clamped to the pages the active selection has.
    pub fn set_page(&mut self, page: usize) {
        let total = self.active_total();
        match self.view {
            DetailsView::Event => self.events.set_page_within(page, total),
            DetailsView::Position => self.positions.set_page_within(page, total),
        }
    }

    /// Next page of the active view; a no-op on the last page.
    pub fn next_page(&mut self) -> bool {
        let total = self.active_total();
        match self.view {
            DetailsView::Event => self.events.next_page(total),
            DetailsView::Position => self.positions.next_page(total),
        }
    }

    /// Previous page of the active view; a no-op on the first page.
    pub fn prev_page(&mut self) -> bool {
        match self.view {
            DetailsView::Event => self.events.prev_page(),
            DetailsView::Position => self.positions.prev_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_parses_both_spellings() {
        assert_eq!("events".parse::<DetailsView>().unwrap(), DetailsView::Event);
        assert_eq!("Position".parse::<DetailsView>().unwrap(), DetailsView::Position);
        assert!("grid".parse::<DetailsView>().is_err());
        assert_eq!(DetailsView::default(), DetailsView::Position);
        assert_eq!(DetailsView::Event.to_string(), "event");
    }

    #[test]
    fn details_page_navigation_flags() {
        let page: DetailsPage<u8> = DetailsPage {
            rows: vec![1],
            page: 2,
            page_count: 3,
            total: 101,
        };
        assert!(page.has_prev());
        assert!(page.has_next());
    }
}
