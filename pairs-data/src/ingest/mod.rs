//! Per-symbol live ingestion: history seed, then a reconnecting trade stream feeding the store.

use crate::{
    candle::Timeframe,
    error::DataError,
    history::{DEFAULT_HISTORY_TIMEOUT, HistoryLoader},
    source::{HistorySource, Tick, TickSource, TickStream},
    store::TimeSeriesStore,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawns and cancels one [`TickIngestor`] task per symbol.
pub mod supervisor;

pub use supervisor::{IngestHandle, IngestSupervisor};

/// Default fixed backoff between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default idle period after which a silent connection is dropped.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of historical bars requested before going live.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Ingestion configuration shared by every symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestConfig {
    /// Fixed delay before reconnecting after a dropped or refused connection.
    pub reconnect_delay: Duration,
    /// A connection that delivers nothing for this long is treated as dropped.
    pub read_timeout: Duration,
    pub history_limit: usize,
    pub history_interval: Timeframe,
    pub history_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            read_timeout: DEFAULT_READ_TIMEOUT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_interval: Timeframe::Second1,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
        }
    }
}

impl IngestConfig {
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_history_interval(mut self, interval: Timeframe) -> Self {
        self.history_interval = interval;
        self
    }

    pub fn with_history_timeout(mut self, timeout: Duration) -> Self {
        self.history_timeout = timeout;
        self
    }
}

/// Live counters for one symbol's ingestion task.
#[derive(Debug, Default)]
pub struct IngestStats {
    ticks: AtomicU64,
    malformed: AtomicU64,
    connections: AtomicU64,
    disconnects: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestStatsSnapshot {
    /// Ticks applied to the store.
    pub ticks: u64,
    /// Messages dropped because they could not be parsed or validated.
    pub malformed: u64,
    /// Successfully established connections.
    pub connections: u64,
    /// Established connections that were subsequently lost.
    pub disconnects: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }

    fn record(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Why a live connection stopped delivering ticks.
#[derive(Debug)]
enum Disconnect {
    Cancelled,
    Ended,
    Failed(DataError),
}

/// Single writer of one symbol's series.
///
/// Runs until cancelled: seeds history once (best effort), then connects, applies ticks in
/// arrival order and reconnects after [`IngestConfig::reconnect_delay`] whenever the connection
/// drops or cannot be established.
pub struct TickIngestor {
    symbol: SmolStr,
    source: Arc<dyn TickSource>,
    history: Option<HistoryLoader>,
    store: Arc<TimeSeriesStore>,
    config: IngestConfig,
    stats: Arc<IngestStats>,
}

impl std::fmt::Debug for TickIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickIngestor")
            .field("symbol", &self.symbol)
            .field("history", &self.history)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TickIngestor {
    pub fn new(
        symbol: impl Into<SmolStr>,
        source: Arc<dyn TickSource>,
        store: Arc<TimeSeriesStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            source,
            history: None,
            store,
            config,
            stats: Arc::new(IngestStats::default()),
        }
    }

    /// Seed the series from `source` before the first live connection.
    pub fn with_history(mut self, source: Arc<dyn HistorySource>) -> Self {
        self.history = Some(
            HistoryLoader::new(source, Arc::clone(&self.store))
                .with_interval(self.config.history_interval)
                .with_timeout(self.config.history_timeout),
        );
        self
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `cancel` fires. Never returns early on upstream failure.
    pub async fn run(self, cancel: CancellationToken) {
        let symbol = self.symbol.clone();

        if let Some(history) = &self.history {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(%symbol, "ingestor cancelled during history load");
                    return;
                }
                result = history.load(&symbol, self.config.history_limit) => {
                    if let Err(error) = result {
                        warn!(%symbol, ?error, "history unavailable, continuing with live data only");
                    }
                }
            }
        }

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;

            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                connected = self.source.connect(&symbol) => connected,
            };

            match connected {
                Ok(stream) => {
                    let connections = IngestStats::record(&self.stats.connections);
                    info!(%symbol, attempt, connections, "connected to upstream trade stream");
                    attempt = 0;

                    match self.consume(stream, &cancel).await {
                        Disconnect::Cancelled => break,
                        Disconnect::Ended => {
                            IngestStats::record(&self.stats.disconnects);
                            warn!(%symbol, "upstream trade stream ended");
                        }
                        Disconnect::Failed(error) => {
                            IngestStats::record(&self.stats.disconnects);
                            warn!(%symbol, ?error, "upstream trade stream failed");
                        }
                    }
                }
                Err(error) => {
                    warn!(%symbol, attempt, ?error, "failed to connect to upstream trade stream");
                }
            }

            debug!(%symbol, delay = ?self.config.reconnect_delay, "waiting before reconnecting");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        info!(%symbol, stats = ?self.stats.snapshot(), "ingestor stopped");
    }

    async fn consume(&self, mut stream: TickStream, cancel: &CancellationToken) -> Disconnect {
        let read_timeout = self.config.read_timeout;

        loop {
            // Deadline restarts with every message
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Disconnect::Cancelled,
                next = tokio::time::timeout(read_timeout, stream.next()) => next,
            };

            let Ok(next) = next else {
                return Disconnect::Failed(DataError::ReadTimeout(read_timeout));
            };

            match next {
                Some(Ok(tick)) => self.apply(tick),
                Some(Err(error)) if error.is_terminal() => return Disconnect::Failed(error),
                Some(Err(error)) => self.drop_malformed(error),
                None => return Disconnect::Ended,
            }
        }
    }

    fn apply(&self, tick: Tick) {
        if !tick.symbol.eq_ignore_ascii_case(&self.symbol) {
            self.drop_malformed(DataError::MalformedMessage(format!(
                "tick for {} received by {} ingestor",
                tick.symbol, self.symbol
            )));
            return;
        }
        if !tick.price.is_finite() || tick.price <= 0.0 {
            self.drop_malformed(DataError::MalformedMessage(format!(
                "invalid tick price {}",
                tick.price
            )));
            return;
        }

        self.store.upsert(&self.symbol, tick.point());
        IngestStats::record(&self.stats.ticks);
    }

    fn drop_malformed(&self, error: DataError) {
        let malformed = IngestStats::record(&self.stats.malformed);
        debug!(symbol = %self.symbol, malformed, ?error, "dropping malformed message");
    }
}
