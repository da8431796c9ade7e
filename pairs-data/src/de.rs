//! Deserialisation helpers for upstream wire formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error};

/// Deserialize a `String` (or `&str`) as the desired type, eg/ `"16578.50"` as `f64`.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let data: std::borrow::Cow<'de, str> = Deserialize::deserialize(deserializer)?;
    data.parse::<T>().map_err(Error::custom)
}

/// Deserialize a `u64` milliseconds value as `DateTime<Utc>`.
pub fn de_u64_epoch_ms_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let epoch_ms = u64::deserialize(deserializer)?;
    datetime_utc_from_epoch_ms(epoch_ms)
        .ok_or_else(|| Error::custom(format!("epoch ms out of range: {epoch_ms}")))
}

/// Construct a `DateTime<Utc>` from milliseconds since the Unix epoch.
pub fn datetime_utc_from_epoch_ms(epoch_ms: u64) -> Option<DateTime<Utc>> {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}
