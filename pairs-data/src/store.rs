//! Bounded, per-symbol time series of traded prices.
//!
//! Every symbol owns one immutable [`Series`] published through an [`ArcSwap`]. Writers build the
//! next version of a series (insert + eviction) off to the side and publish it with a single
//! atomic swap, so readers always load a complete snapshot and never block a writer.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};
use tracing::debug;

/// Maximum number of points retained per symbol.
pub const MAX_POINTS: usize = 3000;

/// A single `(timestamp, price)` observation in a [`Series`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct SeriesPoint {
    pub time: DateTime<Utc>,
    pub price: f64,
}

impl SeriesPoint {
    pub fn new(time: DateTime<Utc>, price: f64) -> Self {
        Self { time, price }
    }
}

/// Ordered sequence of [`SeriesPoint`]s for one symbol.
///
/// Invariants: points are sorted ascending by timestamp and timestamps are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

/// Result of applying one point to a [`Series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new timestamp was inserted.
    Inserted,
    /// An existing point at the same timestamp had its price replaced.
    Replaced,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a [`Series`] from arbitrary points, enforcing the ordering invariants and keeping
    /// at most `max_points` of the most recent timestamps. Later duplicates overwrite earlier ones.
    pub fn from_points<Iter>(points: Iter, max_points: usize) -> Self
    where
        Iter: IntoIterator<Item = SeriesPoint>,
    {
        let mut series = Self::new();
        for point in points {
            series.upsert(point);
        }
        series.evict_to(max_points);
        series
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SeriesPoint> {
        self.points.iter()
    }

    /// Price at exactly `time`, if present.
    pub fn price_at(&self, time: DateTime<Utc>) -> Option<f64> {
        self.points
            .binary_search_by(|point| point.time.cmp(&time))
            .ok()
            .map(|index| self.points[index].price)
    }

    /// Insert `point`, or overwrite the price of the existing point at the same timestamp.
    ///
    /// Live ticks almost always arrive in order, so the common case is a push onto the back.
    pub fn upsert(&mut self, point: SeriesPoint) -> Upsert {
        match self.points.last_mut() {
            None => {
                self.points.push(point);
                return Upsert::Inserted;
            }
            Some(last) if point.time > last.time => {
                self.points.push(point);
                return Upsert::Inserted;
            }
            Some(last) if point.time == last.time => {
                last.price = point.price;
                return Upsert::Replaced;
            }
            Some(_) => {}
        }

        match self
            .points
            .binary_search_by(|existing| existing.time.cmp(&point.time))
        {
            Ok(index) => {
                self.points[index].price = point.price;
                Upsert::Replaced
            }
            Err(index) => {
                self.points.insert(index, point);
                Upsert::Inserted
            }
        }
    }

    /// Evict the oldest points until at most `max_points` remain. Returns the number evicted.
    pub fn evict_to(&mut self, max_points: usize) -> usize {
        let excess = self.points.len().saturating_sub(max_points);
        if excess > 0 {
            self.points.drain(..excess);
        }
        excess
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a SeriesPoint;
    type IntoIter = std::slice::Iter<'a, SeriesPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Every tracked series as of one moment, keyed (and ordered) by symbol.
pub type StoreSnapshot = BTreeMap<SmolStr, Arc<Series>>;

/// Process-wide mapping from symbol to its bounded [`Series`].
///
/// Intended to be created empty once at startup and shared as `Arc<TimeSeriesStore>` between the
/// ingestion tasks (writers) and any number of analytics queries (readers). Entries are never
/// removed during the lifetime of the store.
#[derive(Debug)]
pub struct TimeSeriesStore {
    max_points: usize,
    series: RwLock<HashMap<SmolStr, Arc<ArcSwap<Series>>>>,
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesStore {
    /// Create an empty store retaining [`MAX_POINTS`] per symbol.
    pub fn new() -> Self {
        Self::with_max_points(MAX_POINTS)
    }

    /// Create an empty store retaining `max_points` per symbol (at least one).
    pub fn with_max_points(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(1),
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Insert or overwrite the point at `point.time`, evicting the oldest points if the series
    /// grows beyond the cap. Readers observe either the previous or the next complete series.
    pub fn upsert(&self, symbol: &str, point: SeriesPoint) -> Upsert {
        let slot = self.slot(symbol);
        let max_points = self.max_points;

        let mut outcome = Upsert::Inserted;
        slot.rcu(|current| {
            let mut next = Series::clone(current);
            outcome = next.upsert(point);
            next.evict_to(max_points);
            next
        });
        outcome
    }

    /// Merge many points into a symbol's series with a single atomic publish.
    ///
    /// Returns the length of the series after seeding. Seeding with no points leaves an unknown
    /// symbol untracked.
    pub fn seed<Iter>(&self, symbol: &str, points: Iter) -> usize
    where
        Iter: IntoIterator<Item = SeriesPoint>,
    {
        let points = points.into_iter().collect::<Vec<_>>();
        if points.is_empty() {
            return self.snapshot(symbol).map_or(0, |series| series.len());
        }

        let slot = self.slot(symbol);
        let max_points = self.max_points;

        slot.rcu(|current| {
            let mut next = Series::clone(current);
            for point in &points {
                next.upsert(*point);
            }
            next.evict_to(max_points);
            next
        });

        let len = slot.load().len();
        debug!(%symbol, seeded = points.len(), len, "seeded series");
        len
    }

    /// Immutable snapshot of a symbol's current series, or `None` if the symbol is unknown.
    pub fn snapshot(&self, symbol: &str) -> Option<Arc<Series>> {
        self.series
            .read()
            .get(symbol)
            .map(|slot| slot.load_full())
    }

    /// Snapshot of every tracked series.
    pub fn snapshot_all(&self) -> StoreSnapshot {
        self.series
            .read()
            .iter()
            .map(|(symbol, slot)| (symbol.clone(), slot.load_full()))
            .collect()
    }

    /// Currently tracked symbols.
    pub fn symbols(&self) -> BTreeSet<SmolStr> {
        self.series.read().keys().cloned().collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.read().contains_key(symbol)
    }

    fn slot(&self, symbol: &str) -> Arc<ArcSwap<Series>> {
        if let Some(slot) = self.series.read().get(symbol) {
            return Arc::clone(slot);
        }

        Arc::clone(
            self.series
                .write()
                .entry(SmolStr::new(symbol))
                .or_insert_with(|| Arc::new(ArcSwap::from_pointee(Series::new()))),
        )
    }
}
