//! Augmented Dickey-Fuller unit-root test on the hedged spread of two symbols.
//!
//! The regression includes a constant only. The lag order is chosen by AIC on a common sample,
//! p-values use the MacKinnon (1994) response surface and critical values the MacKinnon (2010)
//! finite-sample tables.

use super::{pairs::PairSnapshot, stats};
use crate::{error::AnalyticsError, store::Series};
use serde::{Deserialize, Serialize};

/// Fewest spread observations for which a lag order of zero still leaves residual degrees of
/// freedom.
pub const ADF_MIN_OBSERVATIONS: usize = 4;

/// p-value below which the spread is reported as stationary.
pub const STATIONARY_P_VALUE: f64 = 0.05;

/// Critical values of the test statistic at the standard significance levels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CriticalValues {
    #[serde(rename = "1%")]
    pub one_percent: f64,
    #[serde(rename = "5%")]
    pub five_percent: f64,
    #[serde(rename = "10%")]
    pub ten_percent: f64,
}

/// Raw test output for one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfStatistic {
    pub adf_stat: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

/// Cointegration test result for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdfResult {
    pub adf_stat: f64,
    pub p_value: f64,
    pub is_stationary: bool,
    pub critical_values: CriticalValues,
    pub used_lag: usize,
    pub nobs: usize,
    pub hedge_ratio: f64,
}

/// Test whether the OLS-hedged spread `A - β·B` of two series is stationary.
///
/// The hedge ratio is fitted independently of any live pair analytics, over the full aligned
/// snapshot.
pub fn adf_test(series_a: &Series, series_b: &Series) -> Result<AdfResult, AnalyticsError> {
    let snapshot = PairSnapshot::align(series_a, series_b);
    if snapshot.len() < ADF_MIN_OBSERVATIONS {
        return Err(AnalyticsError::InsufficientData {
            available: snapshot.len(),
            required: ADF_MIN_OBSERVATIONS,
        });
    }

    let fit = stats::ols_with_intercept(&snapshot.prices_a, &snapshot.prices_b).ok_or_else(|| {
        AnalyticsError::InsufficientVariance("hedge regression leg has zero variance".to_string())
    })?;

    let spread = snapshot.spread(fit.beta);
    if stats::is_degenerate(stats::sample_std(&spread), snapshot.spread_scale(fit.beta)) {
        return Err(AnalyticsError::InsufficientVariance(
            "spread is constant".to_string(),
        ));
    }

    let statistic = augmented_dickey_fuller(&spread)?;

    Ok(AdfResult {
        adf_stat: statistic.adf_stat,
        p_value: statistic.p_value,
        is_stationary: statistic.p_value < STATIONARY_P_VALUE,
        critical_values: statistic.critical_values,
        used_lag: statistic.used_lag,
        nobs: statistic.nobs,
        hedge_ratio: fit.beta,
    })
}

/// Run the ADF test (constant, AIC lag selection) on `series`.
pub fn augmented_dickey_fuller(series: &[f64]) -> Result<AdfStatistic, AnalyticsError> {
    let n = series.len();
    let max_lag = max_lag(n).ok_or(AnalyticsError::InsufficientData {
        available: n,
        required: ADF_MIN_OBSERVATIONS,
    })?;

    if stats::is_degenerate(stats::sample_std(series), stats::magnitude(series)) {
        return Err(AnalyticsError::InsufficientVariance(
            "spread is constant".to_string(),
        ));
    }

    let diffs = series.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>();

    // Lag selection: every candidate is fitted over the sample usable at the largest lag
    let best_lag = (0..=max_lag)
        .filter_map(|lag| {
            let mut columns = vec![vec![1.0; diffs.len() - max_lag]];
            columns.extend(design(series, &diffs, max_lag, lag));
            let fit = stats::regress(&diffs[max_lag..], &columns)?;
            fit.aic().is_finite().then(|| (fit.aic(), lag))
        })
        .min_by(|(aic_a, lag_a), (aic_b, lag_b)| aic_a.total_cmp(aic_b).then(lag_a.cmp(lag_b)))
        .map(|(_, lag)| lag)
        .ok_or_else(singular)?;

    let mut columns = design(series, &diffs, best_lag, best_lag);
    columns.push(vec![1.0; diffs.len() - best_lag]);
    let fit = stats::regress(&diffs[best_lag..], &columns).ok_or_else(singular)?;

    let adf_stat = fit.t_value(0);
    if !adf_stat.is_finite() {
        return Err(singular());
    }

    Ok(AdfStatistic {
        adf_stat,
        p_value: mackinnon_p_value(adf_stat),
        used_lag: best_lag,
        nobs: fit.nobs,
        critical_values: mackinnon_critical_values(fit.nobs),
    })
}

fn singular() -> AnalyticsError {
    AnalyticsError::InsufficientVariance("unit-root regression is singular".to_string())
}

/// Largest lag order considered for `n` observations, or `None` if the sample is too short.
fn max_lag(n: usize) -> Option<usize> {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    (n / 2).checked_sub(2).map(|cap| schwert.min(cap))
}

/// Regressor columns starting at row `start` of `diffs`: the lagged level followed by `lags`
/// lagged differences.
fn design(series: &[f64], diffs: &[f64], start: usize, lags: usize) -> Vec<Vec<f64>> {
    let rows = start..diffs.len();
    let mut columns = Vec::with_capacity(lags + 1);
    columns.push(rows.clone().map(|t| series[t]).collect());
    columns.extend((1..=lags).map(|lag| rows.clone().map(|t| diffs[t - lag]).collect()));
    columns
}

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// MacKinnon (1994) approximate p-value for a constant-only, single-series test statistic.
pub fn mackinnon_p_value(stat: f64) -> f64 {
    if stat > TAU_MAX {
        return 1.0;
    }
    if stat < TAU_MIN {
        return 0.0;
    }

    let coefficients: &[f64] = if stat <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };

    normal_cdf(polyval(coefficients, stat))
}

const CRITICAL_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRITICAL_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRITICAL_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// MacKinnon (2010) critical values for a constant-only test with `nobs` regression observations.
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inverse = 1.0 / nobs as f64;
    CriticalValues {
        one_percent: polyval(&CRITICAL_1, inverse),
        five_percent: polyval(&CRITICAL_5, inverse),
        ten_percent: polyval(&CRITICAL_10, inverse),
    }
}

/// `Σ c_i·x^i` with coefficients in ascending power order.
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, coefficient| acc * x + coefficient)
}

/// Standard normal CDF.
fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Complementary error function, Chebyshev approximation with fractional error below 1.2e-7.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = [
        -1.26551223,
        1.00002368,
        0.37409196,
        0.09678418,
        -0.18628806,
        0.27886807,
        -1.13520398,
        1.48851587,
        -0.82215223,
        0.17087277,
    ];
    let ans = t * (-z * z + polyval(&poly, t)).exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SeriesPoint;
    use chrono::{DateTime, TimeZone, Utc};

    fn time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn indexed(prices: &[f64]) -> Series {
        Series::from_points(
            prices
                .iter()
                .enumerate()
                .map(|(secs, price)| SeriesPoint::new(time(secs as i64), *price)),
            usize::MAX,
        )
    }

    /// Deterministic uniform noise in [-0.5, 0.5).
    fn noise(len: usize) -> Vec<f64> {
        let mut state = 0x2545_f491_4f6c_dd1d_u64;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                (state >> 11) as f64 / (1_u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    #[test]
    fn test_max_lag() {
        struct TestCase {
            n: usize,
            expected: Option<usize>,
        }

        let tests = vec![
            TestCase {
                // TC0: too short for any regression
                n: 3,
                expected: None,
            },
            TestCase {
                // TC1: minimum sample only allows lag zero
                n: 4,
                expected: Some(0),
            },
            TestCase {
                // TC2: capped by half the sample
                n: 20,
                expected: Some(8),
            },
            TestCase {
                // TC3: Schwert rule, ceil(12 · 1^0.25)
                n: 100,
                expected: Some(12),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(max_lag(test.n), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_adf_insufficient_data() {
        let result = adf_test(&indexed(&[1.0, 2.0, 3.0]), &indexed(&[2.0, 4.0, 7.0]));
        assert_eq!(
            result,
            Err(AnalyticsError::InsufficientData {
                available: 3,
                required: ADF_MIN_OBSERVATIONS
            })
        );
    }

    #[test]
    fn test_adf_absent_series_is_insufficient_data() {
        let result = adf_test(&Series::new(), &indexed(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert!(matches!(
            result,
            Err(AnalyticsError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn test_adf_constant_spread_is_insufficient_variance() {
        let prices_b = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let prices_a = prices_b.map(|b| 10.0 + 2.0 * b);

        let result = adf_test(&indexed(&prices_a), &indexed(&prices_b));
        assert!(matches!(result, Err(AnalyticsError::InsufficientVariance(_))));
    }

    #[test]
    fn test_adf_detects_mean_reverting_spread() {
        let noise = noise(200);
        let prices_b = (0..200).map(|t| 100.0 + 0.05 * t as f64).collect::<Vec<_>>();
        let prices_a = prices_b
            .iter()
            .zip(&noise)
            .map(|(b, e)| 2.0 * b + e)
            .collect::<Vec<_>>();

        let result = adf_test(&indexed(&prices_a), &indexed(&prices_b)).unwrap();

        assert!((result.hedge_ratio - 2.0).abs() < 0.05);
        assert!(result.adf_stat < result.critical_values.one_percent);
        assert!(result.p_value < STATIONARY_P_VALUE);
        assert!(result.is_stationary);
        assert_eq!(result.nobs, 199 - result.used_lag);
        assert!(result.used_lag <= 15);
    }

    #[test]
    fn test_adf_is_independent_of_price_units() {
        let noise = noise(200);
        let prices_b = (0..200).map(|t| 100.0 + 0.05 * t as f64).collect::<Vec<_>>();
        let prices_a = prices_b
            .iter()
            .zip(&noise)
            .map(|(b, e)| 2.0 * b + e)
            .collect::<Vec<_>>();
        let micro = |prices: &[f64]| prices.iter().map(|p| p * 1e-6).collect::<Vec<_>>();

        let result = adf_test(&indexed(&prices_a), &indexed(&prices_b)).unwrap();
        let scaled = adf_test(&indexed(&micro(&prices_a)), &indexed(&micro(&prices_b))).unwrap();

        assert_eq!(scaled.used_lag, result.used_lag);
        assert!((scaled.hedge_ratio - result.hedge_ratio).abs() < 1e-6);
        assert!((scaled.adf_stat - result.adf_stat).abs() < 1e-4);
        assert_eq!(scaled.is_stationary, result.is_stationary);
    }

    #[test]
    fn test_mackinnon_p_value() {
        // Asymptotic critical values map back onto their significance levels
        assert!((mackinnon_p_value(-3.43035) - 0.01).abs() < 1e-3);
        assert!((mackinnon_p_value(-2.86154) - 0.05).abs() < 1e-3);
        assert!((mackinnon_p_value(0.0) - 0.9585).abs() < 1e-3);
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert!(mackinnon_p_value(-4.0) < mackinnon_p_value(-2.0));
    }

    #[test]
    fn test_mackinnon_critical_values() {
        let critical = mackinnon_critical_values(100);
        assert!((critical.one_percent - -3.4975).abs() < 1e-3);
        assert!((critical.five_percent - -2.8909).abs() < 1e-3);
        assert!((critical.ten_percent - -2.5825).abs() < 1e-3);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.959964) - 0.975).abs() < 1e-6);
        assert!((normal_cdf(-1.959964) - 0.025).abs() < 1e-6);
    }

    #[test]
    fn test_adf_result_serialises_critical_value_keys() {
        let json = serde_json::to_value(AdfResult {
            adf_stat: -3.0,
            p_value: 0.03,
            is_stationary: true,
            critical_values: mackinnon_critical_values(100),
            used_lag: 1,
            nobs: 98,
            hedge_ratio: 1.5,
        })
        .unwrap();

        assert_eq!(json["isStationary"], true);
        assert!(json["pValue"].is_number());
        assert!(json["criticalValues"]["1%"].is_number());
        assert!(json["criticalValues"]["5%"].is_number());
        assert!(json["criticalValues"]["10%"].is_number());
    }
}
