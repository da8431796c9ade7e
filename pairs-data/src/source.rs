//! Minimal contracts the upstream market data venue must satisfy.
//!
//! Ingestion only ever talks to a [`TickSource`] (a subscribable per-symbol trade stream that may
//! drop at any time) and a [`HistorySource`] (a request-response fetch of recent bars). The
//! concrete vendor wire formats live under [`exchange`](crate::exchange).

use crate::{candle::Timeframe, error::DataError, store::SeriesPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// An upstream-reported trade. Only ever absorbed into a [`SeriesPoint`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Tick {
    pub symbol: SmolStr,
    pub time: DateTime<Utc>,
    pub price: f64,
}

impl Tick {
    pub fn point(&self) -> SeriesPoint {
        SeriesPoint::new(self.time, self.price)
    }
}

/// A historical bar. Only the close is used to seed a series.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub close: f64,
}

impl Bar {
    pub fn point(&self) -> SeriesPoint {
        SeriesPoint::new(self.close_time, self.close)
    }
}

/// Live stream of parsed ticks for one symbol.
///
/// A non-terminal `Err` (see [`DataError::is_terminal`]) is a single bad message; a terminal one
/// or the end of the stream means the connection is gone.
pub type TickStream = BoxStream<'static, Result<Tick, DataError>>;

/// Subscribable per-symbol trade stream.
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Open a new streaming connection for `symbol`.
    async fn connect(&self, symbol: &str) -> Result<TickStream, DataError>;
}

/// Request-response fetch of recent historical bars.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch up to `limit` of the most recent bars of width `interval`, ascending by time.
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError>;
}
