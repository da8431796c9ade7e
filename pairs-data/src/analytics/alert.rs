use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Default absolute z-score above which a spread is flagged as critical.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 2.0;

/// Fraction of the threshold above which a spread is flagged as a warning.
pub const WARNING_RATIO: f64 = 0.8;

/// Severity of a spread's deviation from its rolling mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[display("info")]
    Info,
    #[display("warning")]
    Warning,
    #[display("critical")]
    Critical,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ZScoreAlert {
    pub level: AlertLevel,
    pub message: String,
}

/// Classify `z_score` against `threshold`. An undefined z-score is always [`AlertLevel::Info`].
pub fn classify_zscore(z_score: f64, threshold: f64) -> ZScoreAlert {
    let magnitude = z_score.abs();

    let (level, message) = if z_score.is_nan() {
        (AlertLevel::Info, "z-score undefined, spread has insufficient variance".to_string())
    } else if magnitude > threshold {
        (
            AlertLevel::Critical,
            format!("z-score {z_score:.2} exceeds threshold {threshold:.2}"),
        )
    } else if magnitude > WARNING_RATIO * threshold {
        (
            AlertLevel::Warning,
            format!("z-score {z_score:.2} approaching threshold {threshold:.2}"),
        )
    } else {
        (
            AlertLevel::Info,
            format!("z-score {z_score:.2} within normal range"),
        )
    };

    ZScoreAlert { level, message }
}
