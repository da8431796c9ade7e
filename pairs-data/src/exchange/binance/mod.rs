use self::{kline::BinanceKline, trade::parse_message};
use crate::{
    candle::Timeframe,
    error::DataError,
    source::{Bar, HistorySource, TickSource, TickStream},
};
use async_trait::async_trait;
use futures::{StreamExt, future};
use smol_str::SmolStr;
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};
use url::Url;

/// Kline (historical bar) types for [`BinanceSpot`].
pub mod kline;

/// Public trade types for [`BinanceSpot`].
pub mod trade;

/// [`BinanceSpot`] WebSocket server base url.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams>
pub const BASE_URL_BINANCE_SPOT_WS: &str = "wss://stream.binance.com:9443";

/// [`BinanceSpot`] REST server base url.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api/general-api-information>
pub const BASE_URL_BINANCE_SPOT_REST: &str = "https://api.binance.com";

/// [`BinanceSpot`] kline history endpoint.
pub const KLINES_PATH: &str = "/api/v3/klines";

/// Binance spot market data: per-symbol `<symbol>@trade` streams and kline history.
#[derive(Debug, Clone)]
pub struct BinanceSpot {
    ws_base_url: String,
    rest_base_url: String,
    http: reqwest::Client,
}

impl Default for BinanceSpot {
    fn default() -> Self {
        Self::new(BASE_URL_BINANCE_SPOT_WS, BASE_URL_BINANCE_SPOT_REST)
    }
}

impl BinanceSpot {
    pub fn new(ws_base_url: impl Into<String>, rest_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
            rest_base_url: rest_base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Trade stream url, eg/ `wss://stream.binance.com:9443/ws/btcusdt@trade`.
    pub fn trade_stream_url(&self, symbol: &str) -> Result<Url, DataError> {
        Url::parse(&format!(
            "{}/ws/{}@trade",
            self.ws_base_url.trim_end_matches('/'),
            symbol.to_lowercase()
        ))
        .map_err(DataError::from)
    }

    /// Kline history url, eg/ `https://api.binance.com/api/v3/klines?symbol=BTCUSDT&interval=1s&limit=1000`.
    pub fn klines_url(
        &self,
        symbol: &str,
        interval: Timeframe,
        limit: usize,
    ) -> Result<Url, DataError> {
        Url::parse_with_params(
            &format!("{}{KLINES_PATH}", self.rest_base_url.trim_end_matches('/')),
            &[
                ("symbol", symbol.to_uppercase()),
                ("interval", interval.as_str().to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .map_err(DataError::from)
    }
}

#[async_trait]
impl TickSource for BinanceSpot {
    async fn connect(&self, symbol: &str) -> Result<TickStream, DataError> {
        let url = self.trade_stream_url(symbol)?;
        debug!(%symbol, %url, "connecting to Binance trade stream");

        let (websocket, _) = connect_async(url.as_str())
            .await
            .map_err(|error| DataError::UpstreamUnavailable(error.to_string()))?;

        let symbol = SmolStr::new(symbol);
        Ok(websocket
            .filter_map(move |message| future::ready(parse_message(&symbol, message)))
            .boxed())
    }
}

#[async_trait]
impl HistorySource for BinanceSpot {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError> {
        let url = self.klines_url(symbol, interval, limit)?;
        debug!(%symbol, %url, "fetching Binance klines");

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DataError::UpstreamUnavailable(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let klines = response.json::<Vec<BinanceKline>>().await?;
        let fetched = klines.len();

        let bars = klines
            .into_iter()
            .filter_map(|kline| {
                Bar::try_from(kline)
                    .inspect_err(|error| debug!(%symbol, ?error, "dropping invalid kline"))
                    .ok()
            })
            .collect::<Vec<_>>();

        if bars.len() < fetched {
            warn!(%symbol, fetched, valid = bars.len(), "Binance returned invalid klines");
        }

        Ok(bars)
    }
}
