use pairs_data::{
    analytics::DEFAULT_ZSCORE_THRESHOLD,
    exchange::binance::{BASE_URL_BINANCE_SPOT_REST, BASE_URL_BINANCE_SPOT_WS},
    ingest::IngestConfig,
    query::DEFAULT_PAIR_WINDOW,
};
use smol_str::SmolStr;
use std::{str::FromStr, time::Duration};
use tracing::warn;

const DEFAULT_SYMBOLS: &str = "BTCUSDT,ETHUSDT,SOLUSDT,BNBUSDT,ADAUSDT";
const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Process configuration read from `PAIRS_*` / `BINANCE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub symbols: Vec<SmolStr>,
    pub ws_url: String,
    pub rest_url: String,
    pub ingest: IngestConfig,
    pub report_a: SmolStr,
    pub report_b: SmolStr,
    pub window: usize,
    pub zscore_threshold: f64,
    pub report_interval: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Invalid values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbols = lookup("PAIRS_SYMBOLS")
            .map(|raw| parse_symbols(&raw))
            .unwrap_or_else(|| parse_symbols(DEFAULT_SYMBOLS));
        let symbols = if symbols.is_empty() {
            warn!("PAIRS_SYMBOLS contains no symbols, using defaults");
            parse_symbols(DEFAULT_SYMBOLS)
        } else {
            symbols
        };

        let defaults = IngestConfig::default();
        let ingest = defaults
            .with_history_limit(parse_or(&lookup, "PAIRS_HISTORY_LIMIT", defaults.history_limit))
            .with_reconnect_delay(Duration::from_secs(parse_or(
                &lookup,
                "PAIRS_RECONNECT_DELAY_SECS",
                defaults.reconnect_delay.as_secs(),
            )))
            .with_read_timeout(Duration::from_secs(parse_or(
                &lookup,
                "PAIRS_READ_TIMEOUT_SECS",
                defaults.read_timeout.as_secs(),
            )));

        let zscore_threshold = parse_or(&lookup, "PAIRS_ZSCORE_THRESHOLD", DEFAULT_ZSCORE_THRESHOLD);
        let zscore_threshold = if zscore_threshold.is_finite() && zscore_threshold > 0.0 {
            zscore_threshold
        } else {
            warn!(zscore_threshold, "PAIRS_ZSCORE_THRESHOLD must be positive, using default");
            DEFAULT_ZSCORE_THRESHOLD
        };

        let report_interval = parse_or(
            &lookup,
            "PAIRS_REPORT_INTERVAL_SECS",
            DEFAULT_REPORT_INTERVAL.as_secs(),
        )
        .max(1);

        Self {
            symbols,
            ws_url: lookup("BINANCE_WS_URL")
                .unwrap_or_else(|| BASE_URL_BINANCE_SPOT_WS.to_string()),
            rest_url: lookup("BINANCE_REST_URL")
                .unwrap_or_else(|| BASE_URL_BINANCE_SPOT_REST.to_string()),
            ingest,
            report_a: symbol_or(&lookup, "PAIRS_REPORT_A", "BTCUSDT"),
            report_b: symbol_or(&lookup, "PAIRS_REPORT_B", "ETHUSDT"),
            window: parse_or(&lookup, "PAIRS_WINDOW", DEFAULT_PAIR_WINDOW),
            zscore_threshold,
            report_interval: Duration::from_secs(report_interval),
        }
    }
}

fn parse_symbols(input: &str) -> Vec<SmolStr> {
    let mut symbols = Vec::new();
    for symbol in input.split(',').map(str::trim).filter(|symbol| !symbol.is_empty()) {
        let symbol = SmolStr::new(symbol.to_uppercase());
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn symbol_or<F>(lookup: &F, key: &str, default: &str) -> SmolStr
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty())
        .map(SmolStr::new)
        .unwrap_or_else(|| SmolStr::new(default))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, ?default, "invalid configuration value, using default");
            default
        }),
    }
}
