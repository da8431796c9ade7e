use crate::{de::datetime_utc_from_epoch_ms, error::DataError, source::Bar};
use serde::{Deserialize, Serialize};

/// Binance kline as returned by `GET /api/v3/klines`.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api/market-data-endpoints#klinecandlestick-data>
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BinanceKline(
    pub u64,    // 0: Open time
    pub String, // 1: Open
    pub String, // 2: High
    pub String, // 3: Low
    pub String, // 4: Close
    pub String, // 5: Volume
    pub u64,    // 6: Close time
    pub String, // 7: Quote asset volume
    pub u64,    // 8: Number of trades
    pub String, // 9: Taker buy base asset volume
    pub String, // 10: Taker buy quote asset volume
    pub String, // 11: Ignore
);

impl TryFrom<BinanceKline> for Bar {
    type Error = DataError;

    fn try_from(kline: BinanceKline) -> Result<Self, Self::Error> {
        let time = |epoch_ms| {
            datetime_utc_from_epoch_ms(epoch_ms).ok_or_else(|| {
                DataError::MalformedMessage(format!("kline time out of range: {epoch_ms}"))
            })
        };

        let close = kline
            .4
            .parse::<f64>()
            .map_err(|error| DataError::MalformedMessage(format!("kline close: {error}")))?;
        if !close.is_finite() || close <= 0.0 {
            return Err(DataError::MalformedMessage(format!(
                "invalid kline close {close}"
            )));
        }

        Ok(Bar {
            open_time: time(kline.0)?,
            close_time: time(kline.6)?,
            close,
        })
    }
}
