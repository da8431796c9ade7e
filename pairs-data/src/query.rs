//! Consumer-facing read API over a shared [`TimeSeriesStore`].

use crate::{
    analytics::{AdfResult, PairAnalytics, adf, pairs},
    candle::{self, Candle, Timeframe},
    error::{AnalyticsError, ExportError},
    export::{self, ExportFormat},
    store::{Series, TimeSeriesStore},
};
use smol_str::SmolStr;
use std::{collections::BTreeSet, sync::Arc};

/// Default rolling z-score window for pair analytics.
pub const DEFAULT_PAIR_WINDOW: usize = 20;

/// Read-only queries over the live store.
///
/// Every call takes fresh snapshots, computes synchronously and holds no derived state. Unknown
/// symbols read as empty series.
#[derive(Debug, Clone)]
pub struct MarketQueries {
    store: Arc<TimeSeriesStore>,
}

impl MarketQueries {
    pub fn new(store: Arc<TimeSeriesStore>) -> Self {
        Self { store }
    }

    pub fn symbols(&self) -> BTreeSet<SmolStr> {
        self.store.symbols()
    }

    /// Latest candles for `symbol`. Empty for an unknown symbol.
    pub fn candles(&self, symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
        self.store
            .snapshot(symbol)
            .map(|series| candle::resample(&series, timeframe))
            .unwrap_or_default()
    }

    /// Live pair statistics for `symbol_a` against `symbol_b`.
    pub fn pair_analytics(&self, symbol_a: &str, symbol_b: &str, window: usize) -> PairAnalytics {
        let (series_a, series_b) = self.pair(symbol_a, symbol_b);
        pairs::compute(symbol_a, &series_a, symbol_b, &series_b, window)
    }

    /// Cointegration test on the hedged spread of `symbol_a` and `symbol_b`.
    pub fn cointegration(&self, symbol_a: &str, symbol_b: &str) -> Result<AdfResult, AnalyticsError> {
        let (series_a, series_b) = self.pair(symbol_a, symbol_b);
        adf::adf_test(&series_a, &series_b)
    }

    /// Every tracked series in `format`.
    pub fn export(&self, format: ExportFormat) -> Result<String, ExportError> {
        export::export(&self.store.snapshot_all(), format)
    }

    fn pair(&self, symbol_a: &str, symbol_b: &str) -> (Arc<Series>, Arc<Series>) {
        let load = |symbol: &str| self.store.snapshot(symbol).unwrap_or_default();
        (load(symbol_a), load(symbol_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::point;

    fn queries() -> MarketQueries {
        let store = Arc::new(TimeSeriesStore::new());
        store.seed(
            "BTCUSDT",
            [100.0, 101.0, 102.0, 103.0]
                .into_iter()
                .enumerate()
                .map(|(secs, price)| point(secs as i64, price)),
        );
        store.seed(
            "ETHUSDT",
            [50.0, 50.4, 50.9, 51.3]
                .into_iter()
                .enumerate()
                .map(|(secs, price)| point(secs as i64, price)),
        );
        MarketQueries::new(store)
    }

    #[test]
    fn test_queries_unknown_symbol_reads_as_empty() {
        let queries = queries();

        assert!(queries.candles("DOGEUSDT", Timeframe::Minute1).is_empty());
        assert_eq!(
            queries.pair_analytics("BTCUSDT", "DOGEUSDT", 3),
            PairAnalytics::Warming {
                aligned: 0,
                required: 3
            }
        );
        assert!(matches!(
            queries.cointegration("DOGEUSDT", "BTCUSDT"),
            Err(AnalyticsError::InsufficientData { available: 0, .. })
        ));
        assert!(!queries.symbols().contains("DOGEUSDT"));
    }

    #[test]
    fn test_queries_pair_analytics_ready() {
        let analytics = queries().pair_analytics("BTCUSDT", "ETHUSDT", 3);
        let result = analytics.ready().unwrap();

        assert_eq!(result.symbol_a, "BTCUSDT");
        assert_eq!(result.symbol_b, "ETHUSDT");
        assert!(result.z_score.is_finite());
    }

    #[test]
    fn test_queries_candles_and_export() {
        let queries = queries();

        let candles = queries.candles("BTCUSDT", Timeframe::Minute1);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].close, 103.0);

        let csv = queries.export(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("timestamp,BTCUSDT,ETHUSDT\n"));
        assert_eq!(csv.lines().count(), 5);
    }
}
