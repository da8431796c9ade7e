//! Instantaneous statistical relationship between two symbols' price series.
//!
//! Every call recomputes all statistics from the snapshots it is given, no derived state is
//! carried between calls.

use super::stats::{self, ZScore};
use crate::store::Series;
use chrono::{DateTime, Utc};
use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Smallest usable rolling window: a sample standard deviation needs two values.
pub const MIN_WINDOW: usize = 2;

/// Two series inner-joined on timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairSnapshot {
    pub times: Vec<DateTime<Utc>>,
    pub prices_a: Vec<f64>,
    pub prices_b: Vec<f64>,
}

impl PairSnapshot {
    /// Align `a` and `b` by timestamp, dropping timestamps missing from either side.
    pub fn align(a: &Series, b: &Series) -> Self {
        let mut snapshot = Self::default();

        a.iter()
            .merge_join_by(b.iter(), |left, right| left.time.cmp(&right.time))
            .for_each(|joined| {
                if let EitherOrBoth::Both(left, right) = joined {
                    snapshot.times.push(left.time);
                    snapshot.prices_a.push(left.price);
                    snapshot.prices_b.push(right.price);
                }
            });

        snapshot
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Spread `priceA - β·priceB` at every aligned timestamp.
    pub fn spread(&self, hedge_ratio: f64) -> Vec<f64> {
        self.prices_a
            .iter()
            .zip(&self.prices_b)
            .map(|(a, b)| a - hedge_ratio * b)
            .collect()
    }

    /// Magnitude of the larger spread leg, `max|priceA|` or `|β|·max|priceB|`.
    pub fn spread_scale(&self, hedge_ratio: f64) -> f64 {
        stats::magnitude(&self.prices_a).max(hedge_ratio.abs() * stats::magnitude(&self.prices_b))
    }
}

/// Outcome of a pair analytics query.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status")]
pub enum PairAnalytics {
    /// Not enough aligned history yet; a normal state during startup.
    #[serde(rename = "warming_up")]
    Warming { aligned: usize, required: usize },
    #[serde(rename = "ready")]
    Ready(PairResult),
}

impl PairAnalytics {
    pub fn is_warming(&self) -> bool {
        matches!(self, PairAnalytics::Warming { .. })
    }

    pub fn ready(&self) -> Option<&PairResult> {
        match self {
            PairAnalytics::Ready(result) => Some(result),
            PairAnalytics::Warming { .. } => None,
        }
    }
}

/// Statistics describing two symbols at the latest aligned timestamp.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResult {
    pub symbol_a: SmolStr,
    pub symbol_b: SmolStr,
    pub price_a: f64,
    pub price_b: f64,
    pub mean_a: f64,
    pub std_a: f64,
    pub returns_a: f64,
    pub mean_b: f64,
    pub std_b: f64,
    pub returns_b: f64,
    pub hedge_ratio: f64,
    pub spread: f64,
    pub z_score: f64,
    /// Set when the z-score (or the hedge ratio it depends on) is undefined.
    pub insufficient_variance: bool,
    pub correlation: f64,
    pub aligned: usize,
    pub as_of: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Compute pair analytics for `series_a` against `series_b` with a rolling z-score `window`.
///
/// Returns [`PairAnalytics::Warming`] until at least `window` (and never fewer than
/// [`MIN_WINDOW`]) timestamps are shared by both series.
pub fn compute(
    symbol_a: &str,
    series_a: &Series,
    symbol_b: &str,
    series_b: &Series,
    window: usize,
) -> PairAnalytics {
    let window = window.max(MIN_WINDOW);
    let snapshot = PairSnapshot::align(series_a, series_b);

    if snapshot.len() < window {
        return PairAnalytics::Warming {
            aligned: snapshot.len(),
            required: window,
        };
    }

    PairAnalytics::Ready(compute_aligned(symbol_a, symbol_b, &snapshot, window))
}

fn compute_aligned(
    symbol_a: &str,
    symbol_b: &str,
    snapshot: &PairSnapshot,
    window: usize,
) -> PairResult {
    let last = snapshot.len() - 1;

    let returns_a = stats::pct_returns(&snapshot.prices_a);
    let returns_b = stats::pct_returns(&snapshot.prices_b);

    let (hedge_ratio, spread, z) =
        match stats::ols_with_intercept(&snapshot.prices_a, &snapshot.prices_b) {
            Some(fit) => {
                let spread = snapshot.spread(fit.beta);
                let z = stats::rolling_zscore(&spread, window, snapshot.spread_scale(fit.beta));
                (fit.beta, spread[last], z)
            }
            None => (
                f64::NAN,
                f64::NAN,
                ZScore {
                    value: f64::NAN,
                    insufficient_variance: true,
                },
            ),
        };

    PairResult {
        symbol_a: SmolStr::new(symbol_a),
        symbol_b: SmolStr::new(symbol_b),
        price_a: snapshot.prices_a[last],
        price_b: snapshot.prices_b[last],
        mean_a: stats::mean(&returns_a),
        std_a: stats::sample_std(&returns_a),
        returns_a: returns_a.last().copied().unwrap_or(f64::NAN),
        mean_b: stats::mean(&returns_b),
        std_b: stats::sample_std(&returns_b),
        returns_b: returns_b.last().copied().unwrap_or(f64::NAN),
        hedge_ratio,
        spread,
        z_score: z.value,
        insufficient_variance: z.insufficient_variance,
        correlation: stats::pearson(&returns_a, &returns_b),
        aligned: snapshot.len(),
        as_of: snapshot.times[last],
        timestamp: Utc::now(),
    }
}
