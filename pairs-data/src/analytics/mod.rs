//! On-demand analytics over [`TimeSeriesStore`](crate::store::TimeSeriesStore) snapshots.
//!
//! Nothing here holds state: every statistic is recomputed from the series it is handed.

/// Numerical kernel (moments, returns, regressions) shared by the analytics below.
pub mod stats;

/// Live pair statistics: hedge ratio, spread, rolling z-score and return correlation.
pub mod pairs;

/// Augmented Dickey-Fuller cointegration test on a pair's spread.
pub mod adf;

/// Z-score alert classification.
pub mod alert;

pub use adf::{AdfResult, CriticalValues, adf_test};
pub use alert::{AlertLevel, DEFAULT_ZSCORE_THRESHOLD, ZScoreAlert, classify_zscore};
pub use pairs::{PairAnalytics, PairResult, PairSnapshot};
