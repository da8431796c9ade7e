//! Numerical building blocks shared by pair analytics and the cointegration test.
//!
//! Functions return `f64::NAN` (or `None` for fits) whenever a statistic is undefined, never a
//! silent zero.

/// Relative tolerance below which a dispersion is treated as zero.
pub const VARIANCE_EPSILON: f64 = 1e-9;

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation. NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }

    let mean = mean(values);
    let variance = values
        .iter()
        .map(|&value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Simple percentage returns between consecutive values. Returns N - 1 values for N inputs.
pub fn pct_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Largest absolute value in `values`, zero for an empty slice.
pub fn magnitude(values: &[f64]) -> f64 {
    values
        .iter()
        .fold(0.0_f64, |scale, value| scale.max(value.abs()))
}

/// True if `std` is undefined or zero relative to `scale`, the magnitude of the data it was
/// sampled from. An exact zero is always degenerate.
pub fn is_degenerate(std: f64, scale: f64) -> bool {
    !std.is_finite() || std <= VARIANCE_EPSILON * scale
}

/// Pearson correlation coefficient. NaN if the inputs differ in length, hold fewer than two
/// values, or either side has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return f64::NAN;
    }

    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for (&x, &y) in a.iter().zip(b) {
        let diff_a = x - mean_a;
        let diff_b = y - mean_b;
        cov += diff_a * diff_b;
        var_a += diff_a * diff_a;
        var_b += diff_b * diff_b;
    }

    let std_a = (var_a / (a.len() - 1) as f64).sqrt();
    let std_b = (var_b / (b.len() - 1) as f64).sqrt();
    if is_degenerate(std_a, magnitude(a)) || is_degenerate(std_b, magnitude(b)) {
        return f64::NAN;
    }

    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Intercept and slope of a simple linear regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub alpha: f64,
    pub beta: f64,
}

/// Ordinary least squares of `y` on `x` with an intercept: minimises Σ(y - α - β·x)².
///
/// Returns `None` if the inputs differ in length, hold fewer than two points, or `x` is constant.
pub fn ols_with_intercept(y: &[f64], x: &[f64]) -> Option<LinearFit> {
    if y.len() != x.len() || y.len() < 2 {
        return None;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        sxy += dx * (yi - mean_y);
        sxx += dx * dx;
    }

    let std_x = (sxx / (x.len() - 1) as f64).sqrt();
    if is_degenerate(std_x, magnitude(x)) {
        return None;
    }

    let beta = sxy / sxx;
    Some(LinearFit {
        alpha: mean_y - beta * mean_x,
        beta,
    })
}

/// Rolling z-score of the latest value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScore {
    pub value: f64,
    pub insufficient_variance: bool,
}

/// Z-score of the last value against the mean and sample std of the trailing `window` values.
///
/// Undefined (NaN, flagged) if fewer than `window` values exist, the window is shorter than two,
/// or the trailing values have zero dispersion. Dispersion is measured against `scale` or the
/// trailing values' own magnitude, whichever is larger; a spread passes the size of its legs.
pub fn rolling_zscore(values: &[f64], window: usize, scale: f64) -> ZScore {
    let undefined = ZScore {
        value: f64::NAN,
        insufficient_variance: true,
    };

    if window < 2 || values.len() < window {
        return undefined;
    }

    let trailing = &values[values.len() - window..];
    let mean = mean(trailing);
    let std = sample_std(trailing);
    if is_degenerate(std, scale.max(magnitude(trailing))) {
        return undefined;
    }

    let last = trailing[trailing.len() - 1];
    let value = (last - mean) / std;
    if !value.is_finite() {
        return undefined;
    }

    ZScore {
        value,
        insufficient_variance: false,
    }
}

/// Least squares fit of `y` on the columns of a design matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionFit {
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub ssr: f64,
    pub nobs: usize,
}

impl RegressionFit {
    /// t-statistic of parameter `index`.
    pub fn t_value(&self, index: usize) -> f64 {
        self.params[index] / self.std_errors[index]
    }

    /// Akaike information criterion under Gaussian errors.
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.params.len() as f64
    }
}

/// Multiple regression via the normal equations. `columns` are the regressors, each as long as `y`.
///
/// Returns `None` if there are no residual degrees of freedom or the design matrix is singular.
pub fn regress(y: &[f64], columns: &[Vec<f64>]) -> Option<RegressionFit> {
    let nobs = y.len();
    let k = columns.len();
    if k == 0 || nobs <= k || columns.iter().any(|column| column.len() != nobs) {
        return None;
    }

    // Columns are equilibrated to unit magnitude before inversion
    let scales = columns.iter().map(|column| magnitude(column)).collect::<Vec<_>>();
    if scales.iter().any(|scale| *scale == 0.0 || !scale.is_finite()) {
        return None;
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in i..k {
            let dot = dot(&columns[i], &columns[j]) / (scales[i] * scales[j]);
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
        xty[i] = dot(&columns[i], y) / scales[i];
    }

    let inverse = invert(xtx)?;
    let params = (0..k)
        .map(|i| dot(&inverse[i], &xty) / scales[i])
        .collect::<Vec<_>>();

    let ssr = (0..nobs)
        .map(|row| {
            let fitted = (0..k).map(|j| params[j] * columns[j][row]).sum::<f64>();
            let residual = y[row] - fitted;
            residual * residual
        })
        .sum::<f64>();

    let sigma2 = ssr / (nobs - k) as f64;
    let std_errors = (0..k)
        .map(|i| (sigma2 * inverse[i][i]).sqrt() / scales[i])
        .collect::<Vec<_>>();

    if params.iter().chain(&std_errors).any(|v| !v.is_finite()) {
        return None;
    }

    Some(RegressionFit {
        params,
        std_errors,
        ssr,
        nobs,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gauss-Jordan inversion with partial pivoting. `None` if the matrix is (numerically) singular.
fn invert(mut matrix: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut inverse = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let scale = matrix
        .iter()
        .flatten()
        .fold(0.0_f64, |scale, value| scale.max(value.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&a, &b| {
            matrix[a][col]
                .abs()
                .total_cmp(&matrix[b][col].abs())
        })?;
        if matrix[pivot_row][col].abs() <= 1e-12 * scale {
            return None;
        }
        matrix.swap(col, pivot_row);
        inverse.swap(col, pivot_row);

        let pivot = matrix[col][col];
        for j in 0..n {
            matrix[col][j] /= pivot;
            inverse[col][j] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = matrix[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                matrix[row][j] -= factor * matrix[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }

    Some(inverse)
}
