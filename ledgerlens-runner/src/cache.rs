//! Lazy, one-shot raw-event loading with a memoized in-memory cache.
//!
//! The raw-event source is the expensive one, so it is fetched on first
//! demand only. [`RawEventCache`] guarantees at most one load is ever in
//! flight or completed:
//! - a second trigger while a load runs returns [`LoadOutcome::InFlight`]
//! - any trigger after success returns [`LoadOutcome::AlreadyLoaded`]
//! - a failed load leaves the cache empty, so a later trigger may retry
//!
//! Readers go through [`RawEventCache::get`] and never block: the memo is a
//! `OnceLock` written once by the winning loader.

use crate::source::{SourceError, TabularSource};
use ledgerlens_core::domain::{EnrichedEvent, Position, RawEventRecord, Row};
use ledgerlens_core::reconstruct::reconstruct;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Enriched events and positions derived from one successful raw load.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub events: Vec<EnrichedEvent>,
    pub positions: Vec<Position>,
    /// BLAKE3 over the source rows, for provenance.
    pub fingerprint: String,
}

impl RawDataset {
    pub fn from_rows(rows: &[Row]) -> Self {
        let fingerprint = fingerprint_rows(rows);
        let raw: Vec<RawEventRecord> = rows.iter().map(RawEventRecord::from_row).collect();
        let rec = reconstruct(raw);
        Self {
            events: rec.events,
            positions: rec.positions,
            fingerprint,
        }
    }
}

/// Deterministic BLAKE3 hash over row contents, in row and column order.
pub fn fingerprint_rows(rows: &[Row]) -> String {
    let mut hasher = blake3::Hasher::new();
    for row in rows {
        for (key, value) in row.iter() {
            hasher.update(key.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(value.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.update(&[0x1e]);
    }
    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// This call performed the load.
    Loaded,
    /// A previous load already succeeded; nothing was fetched.
    AlreadyLoaded,
    /// Another load is running; nothing was fetched.
    InFlight,
}

#[derive(Debug, Default)]
pub struct RawEventCache {
    in_flight: AtomicBool,
    data: OnceLock<RawDataset>,
}

/// Clears the in-flight flag when the loader returns, fails, or unwinds.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RawEventCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&RawDataset> {
        self.data.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch raw rows from `source` unless a load already ran or is running.
    pub fn load(&self, source: &dyn TabularSource) -> Result<LoadOutcome, SourceError> {
        self.load_with(|| source.fetch_raw_events())
    }

    /// Like [`Self::load`] with an arbitrary fetch. `fetch` is called at most
    /// once per winning trigger.
    pub fn load_with<F>(&self, fetch: F) -> Result<LoadOutcome, SourceError>
    where
        F: FnOnce() -> Result<Vec<Row>, SourceError>,
    {
        if self.is_loaded() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("raw-event load already in flight");
            return Ok(LoadOutcome::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        // a load may have finished between the two checks
        if self.is_loaded() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        let started = Instant::now();
        tracing::info!("loading raw events");
        let rows = fetch().map_err(|err| {
            tracing::warn!(%err, "raw-event load failed; cache stays empty");
            err
        })?;

        let dataset = RawDataset::from_rows(&rows);
        tracing::info!(
            events = dataset.events.len(),
            positions = dataset.positions.len(),
            fingerprint = %&dataset.fingerprint[..16],
            elapsed_ms = started.elapsed().as_millis() as u64,
            "raw events loaded"
        );

        match self.data.set(dataset) {
            Ok(()) => Ok(LoadOutcome::Loaded),
            Err(_) => Ok(LoadOutcome::AlreadyLoaded),
        }
    }
}

/// Fires once on the first `true` visibility signal.
///
/// After a failed load the owner re-arms it so the next visible signal
/// retries.
#[derive(Debug)]
pub struct VisibilityTrigger {
    armed: AtomicBool,
}

impl Default for VisibilityTrigger {
    fn default() -> Self {
        Self {
            armed: AtomicBool::new(true),
        }
    }
}

impl VisibilityTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly when this signal should start a load.
    pub fn observe(&self, visible: bool) -> bool {
        visible && self.armed.swap(false, Ordering::AcqRel)
    }

    pub fn rearm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}
