//! Serialise a whole-store snapshot for offline analysis.

use crate::{error::ExportError, store::StoreSnapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// Supported interchange formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Wide table: a `timestamp` column then one price column per symbol.
    #[default]
    #[display("csv")]
    Csv,
    /// `{symbol: {timestamp: price}}`.
    #[display("json")]
    Json,
}

impl ExportFormat {
    /// Parse a format name, falling back to [`ExportFormat::Csv`].
    pub fn parse(input: &str) -> Self {
        if input.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Csv
        }
    }
}

/// Render `snapshot` in `format`.
pub fn export(snapshot: &StoreSnapshot, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => export_csv(snapshot),
        ExportFormat::Json => export_json(snapshot),
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn export_csv(snapshot: &StoreSnapshot) -> Result<String, ExportError> {
    let times = snapshot
        .values()
        .flat_map(|series| series.iter().map(|point| point.time))
        .collect::<BTreeSet<_>>();

    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(
        std::iter::once("timestamp").chain(snapshot.keys().map(SmolStr::as_str)),
    )?;

    for time in times {
        let mut record = Vec::with_capacity(snapshot.len() + 1);
        record.push(format_time(time));
        record.extend(snapshot.values().map(|series| {
            series
                .price_at(time)
                .map(|price| price.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| ExportError::Csv(error.to_string()))?;
    String::from_utf8(bytes).map_err(|error| ExportError::Csv(error.to_string()))
}

fn export_json(snapshot: &StoreSnapshot) -> Result<String, ExportError> {
    let table = snapshot
        .iter()
        .map(|(symbol, series)| {
            let prices = series
                .iter()
                .map(|point| (format_time(point.time), point.price))
                .collect::<BTreeMap<_, _>>();
            (symbol.clone(), prices)
        })
        .collect::<BTreeMap<_, _>>();

    serde_json::to_string(&table).map_err(ExportError::from)
}
