//! Scripted in-memory upstream sources for driving ingestion in tests.

use crate::{
    candle::Timeframe,
    error::DataError,
    source::{Bar, HistorySource, Tick, TickSource, TickStream},
    store::SeriesPoint,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::collections::VecDeque;
use tokio::time::Instant;

pub fn time(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn point(secs: i64, price: f64) -> SeriesPoint {
    SeriesPoint::new(time(secs), price)
}

pub fn tick(symbol: &str, secs: i64, price: f64) -> Result<Tick, DataError> {
    Ok(Tick {
        symbol: SmolStr::new(symbol),
        time: time(secs),
        price,
    })
}

pub fn malformed() -> Result<Tick, DataError> {
    Err(DataError::MalformedMessage("missing field `p`".to_string()))
}

/// One scripted `connect` outcome.
pub enum Connection {
    /// Yield the items, then end the stream.
    Finite(Vec<Result<Tick, DataError>>),
    /// Yield the items, then stay silent forever.
    Open(Vec<Result<Tick, DataError>>),
    Refused(DataError),
}

/// [`TickSource`] replaying scripted connections in order. Once the script is exhausted every
/// connect yields a silent, never-ending stream.
#[derive(Default)]
pub struct ScriptedTicks {
    script: Mutex<VecDeque<Connection>>,
    attempts: Mutex<Vec<(SmolStr, Instant)>>,
}

impl ScriptedTicks {
    pub fn new(script: impl IntoIterator<Item = Connection>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Instants of every connect attempt.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn attempts_for(&self, symbol: &str) -> usize {
        self.attempts
            .lock()
            .iter()
            .filter(|(attempted, _)| attempted == symbol)
            .count()
    }
}

#[async_trait]
impl TickSource for ScriptedTicks {
    async fn connect(&self, symbol: &str) -> Result<TickStream, DataError> {
        self.attempts
            .lock()
            .push((SmolStr::new(symbol), Instant::now()));

        match self.script.lock().pop_front() {
            Some(Connection::Finite(items)) => Ok(stream::iter(items).boxed()),
            Some(Connection::Open(items)) => {
                Ok(stream::iter(items).chain(stream::pending()).boxed())
            }
            Some(Connection::Refused(error)) => Err(error),
            None => Ok(stream::pending().boxed()),
        }
    }
}

/// [`HistorySource`] returning fixed bars for every symbol.
pub struct ScriptedHistory {
    pub bars: Vec<Bar>,
}

#[async_trait]
impl HistorySource for ScriptedHistory {
    async fn fetch_bars(
        &self,
        _: &str,
        _: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError> {
        Ok(self.bars.iter().take(limit).cloned().collect())
    }
}
