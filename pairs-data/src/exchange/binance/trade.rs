use crate::{error::DataError, source::Tick};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

/// Binance real-time trade message.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#trade-streams>
/// ```json
/// {
///     "e": "trade",
///     "E": 1672515782136,
///     "s": "BTCUSDT",
///     "t": 12345,
///     "p": "16578.50",
///     "q": "0.001",
///     "T": 1672515782134,
///     "m": true,
///     "M": true
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BinanceTrade {
    #[serde(rename = "s")]
    pub symbol: SmolStr,

    #[serde(
        rename = "T",
        deserialize_with = "crate::de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub time: DateTime<Utc>,

    #[serde(rename = "p", deserialize_with = "crate::de::de_str")]
    pub price: f64,
}

impl BinanceTrade {
    /// Validate the trade against the `expected` symbol and convert it into a [`Tick`].
    pub fn into_tick(self, expected: &str) -> Result<Tick, DataError> {
        if !self.symbol.eq_ignore_ascii_case(expected) {
            return Err(DataError::MalformedMessage(format!(
                "trade for {} received on {expected} stream",
                self.symbol
            )));
        }

        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(DataError::MalformedMessage(format!(
                "invalid trade price {} for {expected}",
                self.price
            )));
        }

        Ok(Tick {
            symbol: SmolStr::new(expected),
            time: self.time,
            price: self.price,
        })
    }
}

/// Parse one raw trade payload for `expected`.
pub fn parse_trade(expected: &str, payload: &[u8]) -> Result<Tick, DataError> {
    serde_json::from_slice::<BinanceTrade>(payload)?.into_tick(expected)
}

/// Map one WebSocket frame to an optional tick result.
///
/// Control frames yield `None`, a close frame yields [`DataError::StreamClosed`].
pub fn parse_message(
    expected: &str,
    message: Result<Message, tungstenite::Error>,
) -> Option<Result<Tick, DataError>> {
    match message {
        Ok(Message::Text(text)) => Some(parse_trade(expected, text.as_bytes())),
        Ok(Message::Binary(bytes)) => Some(parse_trade(expected, &bytes)),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Ok(Message::Close(frame)) => {
            debug!(symbol = %expected, ?frame, "Binance closed trade stream");
            Some(Err(DataError::StreamClosed(format!(
                "close frame received: {frame:?}"
            ))))
        }
        Err(error) => Some(Err(DataError::from(error))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trade() {
        struct TestCase {
            input: &'static str,
            expected: Result<(i64, f64), ()>,
        }

        let tests = vec![
            TestCase {
                // TC0: valid trade
                input: r#"{"e":"trade","E":1672515782136,"s":"BTCUSDT","t":12345,"p":"16578.50","q":"0.001","T":1672515782134,"m":true,"M":true}"#,
                expected: Ok((1672515782134, 16578.50)),
            },
            TestCase {
                // TC1: missing price
                input: r#"{"e":"trade","s":"BTCUSDT","T":1672515782134}"#,
                expected: Err(()),
            },
            TestCase {
                // TC2: non-numeric price
                input: r#"{"s":"BTCUSDT","p":"abc","T":1672515782134}"#,
                expected: Err(()),
            },
            TestCase {
                // TC3: zero price
                input: r#"{"s":"BTCUSDT","p":"0.00","T":1672515782134}"#,
                expected: Err(()),
            },
            TestCase {
                // TC4: non-finite price
                input: r#"{"s":"BTCUSDT","p":"NaN","T":1672515782134}"#,
                expected: Err(()),
            },
            TestCase {
                // TC5: trade for a different symbol
                input: r#"{"s":"ETHUSDT","p":"1200.10","T":1672515782134}"#,
                expected: Err(()),
            },
            TestCase {
                // TC6: invalid json
                input: r#"{"s":"BTCUSDT","#,
                expected: Err(()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = parse_trade("BTCUSDT", test.input.as_bytes());
            match (actual, test.expected) {
                (Ok(tick), Ok((time, price))) => {
                    assert_eq!(tick.symbol, "BTCUSDT", "TC{} failed", index);
                    assert_eq!(tick.time.timestamp_millis(), time, "TC{} failed", index);
                    assert_eq!(tick.price, price, "TC{} failed", index);
                }
                (Err(error), Err(())) => {
                    assert!(
                        matches!(error, DataError::MalformedMessage(_)),
                        "TC{} failed",
                        index
                    );
                }
                (actual, expected) => {
                    panic!("TC{index} failed: actual {actual:?}, expected {expected:?}")
                }
            }
        }
    }

    #[test]
    fn test_parse_message_control_frames() {
        assert!(parse_message("BTCUSDT", Ok(Message::Ping(vec![].into()))).is_none());
        assert!(parse_message("BTCUSDT", Ok(Message::Pong(vec![].into()))).is_none());

        let closed = parse_message("BTCUSDT", Ok(Message::Close(None)));
        assert!(matches!(closed, Some(Err(DataError::StreamClosed(_)))));

        let failed = parse_message("BTCUSDT", Err(tungstenite::Error::ConnectionClosed));
        assert!(matches!(failed, Some(Err(ref error)) if error.is_terminal()));
    }

    #[test]
    fn test_parse_message_text_frame() {
        let message = Message::text(r#"{"s":"BTCUSDT","p":"100.5","T":1000}"#);
        let tick = parse_message("btcusdt", Ok(message)).unwrap().unwrap();
        assert_eq!(tick.symbol, "btcusdt");
        assert_eq!(tick.price, 100.5);
    }
}
