#![warn(unused, rust_2018_idioms)]

//! # Pairs-Data
//! Live statistical-arbitrage market data for a fixed set of instruments.
//!
//! * **Ingest**: one reconnecting task per symbol seeds recent history, then applies live trades
//!   to a bounded series ([`ingest::TickIngestor`], [`ingest::IngestSupervisor`]).
//! * **Store**: lock-free snapshot reads of every series while ingestion keeps writing
//!   ([`store::TimeSeriesStore`]).
//! * **Analyse**: OHLC resampling, pair hedge ratio / spread z-score / correlation and an ADF
//!   cointegration test, all recomputed from snapshots on demand ([`query::MarketQueries`]).
//!
//! ## Example
//! ```rust,no_run
//! use pairs_data::{
//!     analytics::PairAnalytics,
//!     exchange::binance::BinanceSpot,
//!     ingest::{IngestConfig, IngestSupervisor},
//!     query::MarketQueries,
//!     store::TimeSeriesStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(TimeSeriesStore::new());
//!     let binance = Arc::new(BinanceSpot::default());
//!
//!     let mut supervisor =
//!         IngestSupervisor::new(Arc::clone(&store), binance.clone(), IngestConfig::default())
//!             .with_history(binance);
//!     supervisor.spawn_all(["BTCUSDT", "ETHUSDT"]);
//!
//!     let queries = MarketQueries::new(store);
//!     if let PairAnalytics::Ready(pair) = queries.pair_analytics("BTCUSDT", "ETHUSDT", 20) {
//!         println!("z-score: {}", pair.z_score);
//!     }
//!
//!     supervisor.shutdown().await;
//! }
//! ```

/// Pair statistics, ADF cointegration test and z-score alerts.
pub mod analytics;

/// OHLC candle resampling of a series.
pub mod candle;

/// Deserialisation helpers for upstream wire formats.
pub mod de;

/// All [`Error`](std::error::Error)s generated in Pairs-Data.
pub mod error;

/// Upstream venue adapters.
pub mod exchange;

/// Whole-store CSV / JSON export.
pub mod export;

/// History backfill of a series.
pub mod history;

/// Per-symbol live ingestion tasks.
pub mod ingest;

/// Consumer-facing query facade.
pub mod query;

/// Upstream source contracts and their tick / bar types.
pub mod source;

/// Bounded per-symbol price series and the shared store.
pub mod store;

#[cfg(test)]
mod test_utils;

pub use error::{AnalyticsError, DataError, ExportError};
