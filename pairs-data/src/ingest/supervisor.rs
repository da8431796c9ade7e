use super::{IngestConfig, IngestStats, IngestStatsSnapshot, TickIngestor};
use crate::{
    source::{HistorySource, TickSource},
    store::TimeSeriesStore,
};
use futures::future::join_all;
use smol_str::SmolStr;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Running ingestion task for one symbol.
#[derive(Debug)]
pub struct IngestHandle {
    cancel: CancellationToken,
    stats: Arc<IngestStats>,
    task: JoinHandle<()>,
}

impl IngestHandle {
    pub fn stats(&self) -> IngestStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(error) = self.task.await {
            warn!(?error, "ingestion task did not exit cleanly");
        }
    }
}

/// Owns every per-symbol [`TickIngestor`] task writing into one [`TimeSeriesStore`].
///
/// Each task runs under a child of the supervisor's [`CancellationToken`], so a symbol can be
/// stopped on its own while [`IngestSupervisor::shutdown`] stops them all.
pub struct IngestSupervisor {
    store: Arc<TimeSeriesStore>,
    source: Arc<dyn TickSource>,
    history: Option<Arc<dyn HistorySource>>,
    config: IngestConfig,
    cancel: CancellationToken,
    handles: HashMap<SmolStr, IngestHandle>,
}

impl std::fmt::Debug for IngestSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestSupervisor")
            .field("config", &self.config)
            .field("symbols", &self.handles.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl IngestSupervisor {
    pub fn new(
        store: Arc<TimeSeriesStore>,
        source: Arc<dyn TickSource>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            source,
            history: None,
            config,
            cancel: CancellationToken::new(),
            handles: HashMap::new(),
        }
    }

    /// Seed each symbol from `history` before it goes live.
    pub fn with_history(mut self, history: Arc<dyn HistorySource>) -> Self {
        self.history = Some(history);
        self
    }

    /// Spawn an ingestion task for `symbol`. Returns `false` if one is already running.
    pub fn spawn(&mut self, symbol: &str) -> bool {
        if self
            .handles
            .get(symbol)
            .is_some_and(|handle| !handle.is_finished())
        {
            return false;
        }

        let mut ingestor = TickIngestor::new(
            symbol,
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.config,
        );
        if let Some(history) = &self.history {
            ingestor = ingestor.with_history(Arc::clone(history));
        }

        let cancel = self.cancel.child_token();
        let stats = ingestor.stats();
        let task = tokio::spawn(ingestor.run(cancel.clone()));

        info!(%symbol, "spawned ingestion task");
        self.handles.insert(
            SmolStr::new(symbol),
            IngestHandle {
                cancel,
                stats,
                task,
            },
        );
        true
    }

    /// Spawn every symbol in `symbols`, returning how many new tasks were started.
    pub fn spawn_all<'a>(&mut self, symbols: impl IntoIterator<Item = &'a str>) -> usize {
        symbols
            .into_iter()
            .filter(|symbol| self.spawn(symbol))
            .count()
    }

    /// Stop the task for `symbol` without affecting any other. Returns `false` if unknown.
    pub async fn stop(&mut self, symbol: &str) -> bool {
        match self.handles.remove(symbol) {
            Some(handle) => {
                handle.stop().await;
                info!(%symbol, "stopped ingestion task");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, symbol: &str) -> bool {
        self.handles
            .get(symbol)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Symbols with a spawned task.
    pub fn symbols(&self) -> Vec<SmolStr> {
        let mut symbols = self.handles.keys().cloned().collect::<Vec<_>>();
        symbols.sort();
        symbols
    }

    /// Counters of every spawned task.
    pub fn stats(&self) -> BTreeMap<SmolStr, IngestStatsSnapshot> {
        self.handles
            .iter()
            .map(|(symbol, handle)| (symbol.clone(), handle.stats()))
            .collect()
    }

    /// Cancel every task and wait for all of them to exit.
    pub async fn shutdown(self) {
        info!(tasks = self.handles.len(), "shutting down ingestion");
        self.cancel.cancel();
        join_all(self.handles.into_values().map(IngestHandle::stop)).await;
    }
}
