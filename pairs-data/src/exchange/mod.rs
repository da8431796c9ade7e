//! Upstream venue adapters implementing [`TickSource`](crate::source::TickSource) and
//! [`HistorySource`](crate::source::HistorySource).

/// Binance spot trade stream and kline history.
pub mod binance;
