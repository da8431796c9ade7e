//! Fixed-width OHLC resampling of a tick [`Series`].
//!
//! Buckets are aligned to the Unix epoch using point timestamps (never the wall clock), so a
//! backfilled series resamples exactly like a live one.

use crate::store::{Series, SeriesPoint};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Maximum number of candles returned by [`resample`].
pub const MAX_CANDLES: usize = 60;

/// Supported bucket widths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Deserialize, Serialize)]
pub enum Timeframe {
    #[display("1s")]
    #[serde(rename = "1s")]
    Second1,
    #[default]
    #[display("1m")]
    #[serde(rename = "1m")]
    Minute1,
    #[display("5m")]
    #[serde(rename = "5m")]
    Minute5,
}

impl Timeframe {
    /// Parse a timeframe string, falling back to [`Timeframe::Minute1`] for anything unrecognised.
    ///
    /// `"1s"` resamples into one-second buckets. Earlier dashboard backends treated it as
    /// unrecognised and served one-minute candles instead.
    pub fn parse(input: &str) -> Self {
        match input {
            "1s" => Self::Second1,
            "1m" => Self::Minute1,
            "5m" => Self::Minute5,
            _ => Self::Minute1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Second1 => "1s",
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
        }
    }

    pub fn duration_ms(&self) -> i64 {
        match self {
            Self::Second1 => 1_000,
            Self::Minute1 => 60_000,
            Self::Minute5 => 300_000,
        }
    }

    /// Start of the bucket containing `time`.
    #[inline]
    pub fn bucket_start(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let width = self.duration_ms();
        let start_ms = time.timestamp_millis().div_euclid(width) * width;
        DateTime::from_timestamp_millis(start_ms).unwrap_or(time)
    }
}

impl From<&str> for Timeframe {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Open-high-low-close summary of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    /// Bucket start.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    fn open_at(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    fn update(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }
}

/// Resample `series` into `timeframe` buckets, returning the most recent [`MAX_CANDLES`]
/// non-empty buckets in ascending time order. Empty buckets are omitted, not forward-filled.
pub fn resample(series: &Series, timeframe: Timeframe) -> Vec<Candle> {
    resample_points(series.points(), timeframe, MAX_CANDLES)
}

/// Resample already time-ordered `points`, keeping at most `limit` of the latest candles.
pub fn resample_points(points: &[SeriesPoint], timeframe: Timeframe, limit: usize) -> Vec<Candle> {
    let mut candles: Vec<Candle> = Vec::new();

    for point in points {
        let bucket = timeframe.bucket_start(point.time);
        match candles.last_mut() {
            Some(current) if current.timestamp == bucket => current.update(point.price),
            _ => candles.push(Candle::open_at(bucket, point.price)),
        }
    }

    let excess = candles.len().saturating_sub(limit);
    candles.drain(..excess);
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, min, sec).unwrap()
    }

    fn series(points: &[(DateTime<Utc>, f64)]) -> Series {
        Series::from_points(
            points.iter().map(|(time, price)| SeriesPoint::new(*time, *price)),
            usize::MAX,
        )
    }

    #[test]
    fn test_timeframe_parse() {
        struct TestCase {
            input: &'static str,
            expected: Timeframe,
        }

        let tests = vec![
            TestCase {
                // TC0: one second
                input: "1s",
                expected: Timeframe::Second1,
            },
            TestCase {
                // TC1: one minute
                input: "1m",
                expected: Timeframe::Minute1,
            },
            TestCase {
                // TC2: five minutes
                input: "5m",
                expected: Timeframe::Minute5,
            },
            TestCase {
                // TC3: unrecognised falls back to one minute
                input: "1h",
                expected: Timeframe::Minute1,
            },
            TestCase {
                // TC4: empty falls back to one minute
                input: "",
                expected: Timeframe::Minute1,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = Timeframe::parse(test.input);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_resample_one_minute_buckets() {
        let series = series(&[
            (at(10, 0, 5), 100.0),
            (at(10, 0, 40), 102.0),
            (at(10, 1, 10), 101.0),
        ]);

        let candles = resample(&series, Timeframe::parse("1m"));

        assert_eq!(
            candles,
            vec![
                Candle {
                    timestamp: at(10, 0, 0),
                    open: 100.0,
                    high: 102.0,
                    low: 100.0,
                    close: 102.0,
                },
                Candle {
                    timestamp: at(10, 1, 0),
                    open: 101.0,
                    high: 101.0,
                    low: 101.0,
                    close: 101.0,
                },
            ]
        );
    }

    #[test]
    fn test_resample_tracks_intra_bucket_extremes() {
        let series = series(&[
            (at(10, 0, 1), 100.0),
            (at(10, 0, 2), 105.0),
            (at(10, 0, 3), 95.0),
            (at(10, 4, 59), 99.0),
        ]);

        let candles = resample(&series, Timeframe::Minute5);

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, at(10, 0, 0));
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].high, 105.0);
        assert_eq!(candles[0].low, 95.0);
        assert_eq!(candles[0].close, 99.0);
    }

    #[test]
    fn test_resample_omits_empty_buckets() {
        let series = series(&[(at(10, 0, 0), 1.0), (at(10, 3, 0), 2.0)]);

        let candles = resample(&series, Timeframe::Minute1);

        let buckets = candles.iter().map(|c| c.timestamp).collect::<Vec<_>>();
        assert_eq!(buckets, vec![at(10, 0, 0), at(10, 3, 0)]);
    }

    #[test]
    fn test_resample_keeps_latest_sixty() {
        let points = (0..90)
            .map(|minute| (at(0, 0, 0) + chrono::Duration::minutes(minute), minute as f64))
            .collect::<Vec<_>>();

        let candles = resample(&series(&points), Timeframe::Minute1);

        assert_eq!(candles.len(), MAX_CANDLES);
        assert_eq!(candles.first().unwrap().close, 30.0);
        assert_eq!(candles.last().unwrap().close, 89.0);
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_resample_empty_series() {
        assert!(resample(&Series::new(), Timeframe::Minute1).is_empty());
    }

    #[test]
    fn test_bucket_start_aligns_to_epoch() {
        let time = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        assert_eq!(
            Timeframe::Second1.bucket_start(time).timestamp_millis(),
            1_700_000_123_000
        );
        assert_eq!(
            Timeframe::Minute5.bucket_start(time).timestamp_millis(),
            1_700_000_100_000
        );
    }
}
