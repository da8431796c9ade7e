//! One-shot backfill of a symbol's series from recent historical bars.

use crate::{
    candle::Timeframe,
    error::DataError,
    source::HistorySource,
    store::TimeSeriesStore,
};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Default upper bound on a single history request.
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Seeds a [`TimeSeriesStore`] with the closes of recent bars from a [`HistorySource`].
#[derive(Clone)]
pub struct HistoryLoader {
    source: Arc<dyn HistorySource>,
    store: Arc<TimeSeriesStore>,
    interval: Timeframe,
    timeout: Duration,
}

impl std::fmt::Debug for HistoryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLoader")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HistoryLoader {
    pub fn new(source: Arc<dyn HistorySource>, store: Arc<TimeSeriesStore>) -> Self {
        Self {
            source,
            store,
            interval: Timeframe::Second1,
            timeout: DEFAULT_HISTORY_TIMEOUT,
        }
    }

    pub fn with_interval(mut self, interval: Timeframe) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch up to `limit` recent bars for `symbol` and merge their `(close_time, close)` points
    /// into the store in one swap.
    ///
    /// Returns the length of the symbol's series after seeding. On any failure the store is left
    /// untouched and the caller is expected to continue with live data only.
    pub async fn load(&self, symbol: &str, limit: usize) -> Result<usize, DataError> {
        let bars = tokio::time::timeout(
            self.timeout,
            self.source.fetch_bars(symbol, self.interval, limit),
        )
        .await
        .map_err(|_| {
            DataError::UpstreamUnavailable(format!(
                "history request timed out after {:?}",
                self.timeout
            ))
        })?
        .map_err(|error| match error {
            DataError::UpstreamUnavailable(_) => error,
            other => DataError::UpstreamUnavailable(other.to_string()),
        })
        .inspect_err(|error| warn!(%symbol, ?error, "failed to load history"))?;

        let fetched = bars.len();
        let seeded = self
            .store
            .seed(symbol, bars.iter().map(|bar| bar.point()));

        info!(%symbol, fetched, seeded, interval = %self.interval, "loaded history");
        Ok(seeded)
    }
}
