use crate::config::ServerConfig;
use pairs_data::{
    analytics::{AlertLevel, PairAnalytics, classify_zscore},
    exchange::binance::BinanceSpot,
    ingest::IngestSupervisor,
    query::MarketQueries,
    store::TimeSeriesStore,
};
use rustls::crypto::ring::default_provider;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod config;

#[tokio::main]
async fn main() {
    // Both reqwest and tokio-tungstenite link rustls, so pick the process-wide provider up front
    let _ = default_provider().install_default();

    init_logging();

    let config = ServerConfig::from_env();
    info!(?config, "starting pairs-data server");

    let store = Arc::new(TimeSeriesStore::new());
    let binance = Arc::new(BinanceSpot::new(config.ws_url.clone(), config.rest_url.clone()));

    let mut supervisor = IngestSupervisor::new(Arc::clone(&store), binance.clone(), config.ingest)
        .with_history(binance);
    let spawned = supervisor.spawn_all(config.symbols.iter().map(SmolStr::as_str));
    info!(spawned, symbols = ?config.symbols, "ingestion started");

    let queries = MarketQueries::new(store);
    let mut report = tokio::time::interval(config.report_interval);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(error) = result {
                    warn!(?error, "failed to listen for Ctrl-C, shutting down");
                } else {
                    info!("received Ctrl-C, shutting down");
                }
                break;
            }
            _ = report.tick() => {
                report_pair(&queries, &config);
                debug!(stats = ?supervisor.stats(), "ingestion stats");
            }
        }
    }

    supervisor.shutdown().await;
    info!("pairs-data server stopped");
}

/// Log the configured pair's analytics, z-score alert and cointegration test.
fn report_pair(queries: &MarketQueries, config: &ServerConfig) {
    let (symbol_a, symbol_b) = (config.report_a.as_str(), config.report_b.as_str());

    match queries.pair_analytics(symbol_a, symbol_b, config.window) {
        PairAnalytics::Warming { aligned, required } => {
            info!(%symbol_a, %symbol_b, aligned, required, "pair analytics warming up");
            return;
        }
        PairAnalytics::Ready(pair) => {
            let alert = classify_zscore(pair.z_score, config.zscore_threshold);
            info!(
                %symbol_a,
                %symbol_b,
                price_a = pair.price_a,
                price_b = pair.price_b,
                hedge_ratio = pair.hedge_ratio,
                spread = pair.spread,
                z_score = pair.z_score,
                correlation = pair.correlation,
                insufficient_variance = pair.insufficient_variance,
                aligned = pair.aligned,
                "pair analytics"
            );
            let detail = alert.message.as_str();
            match alert.level {
                AlertLevel::Critical => warn!(%symbol_a, %symbol_b, alert = detail, "z-score alert"),
                AlertLevel::Warning => info!(%symbol_a, %symbol_b, alert = detail, "z-score alert"),
                AlertLevel::Info => debug!(%symbol_a, %symbol_b, alert = detail, "z-score alert"),
            }
        }
    }

    match queries.cointegration(symbol_a, symbol_b) {
        Ok(adf) => info!(
            %symbol_a,
            %symbol_b,
            adf_stat = adf.adf_stat,
            p_value = adf.p_value,
            is_stationary = adf.is_stationary,
            used_lag = adf.used_lag,
            nobs = adf.nobs,
            "cointegration test"
        ),
        Err(error) => debug!(%symbol_a, %symbol_b, %error, "cointegration test unavailable"),
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
