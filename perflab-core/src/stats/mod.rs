//! Metrics library: pure functions of a prepared return series.
//!
//! Every public metric takes a `&ReturnSeries` (plus a benchmark or
//! parameters where relevant), prepares it unless it is already prepared,
//! and returns a value. Degenerate inputs never raise: a zero or vanishing
//! denominator yields `0.0`, the mean of an empty subset is `0.0`, and a
//! standard deviation needs at least two observations.
//!
//! Conventions shared by all metrics:
//! - standard deviation, variance and covariance use the sample estimator
//!   (`n - 1`);
//! - quantiles interpolate linearly between order statistics;
//! - skewness and kurtosis are the bias-corrected sample estimators, with
//!   kurtosis reported as excess kurtosis.

pub mod benchmark;
pub mod distribution;
pub mod ratios;
pub mod returns;
pub mod rolling;
pub mod winloss;

pub use benchmark::*;
pub use distribution::*;
pub use ratios::*;
pub use returns::*;
pub use rolling::*;
pub use winloss::*;

use crate::error::Result;
use crate::prepare::{prepare_returns, require_periods, PrepareOptions};
use crate::series::ReturnSeries;

/// Denominators smaller than this in magnitude are treated as zero.
pub const EPSILON: f64 = 1e-15;

// ─── Preparation helpers ────────────────────────────────────────────

/// Prepared returns without risk-free adjustment.
pub(crate) fn prepared(returns: &ReturnSeries) -> Result<ReturnSeries> {
    prepare_returns(returns, &PrepareOptions::default())
}

/// Prepared excess returns. A non-zero `rf` requires `periods`.
pub(crate) fn prepared_excess(
    returns: &ReturnSeries,
    rf: f64,
    periods: Option<u32>,
) -> Result<ReturnSeries> {
    require_periods(rf, periods)?;
    prepare_returns(returns, &PrepareOptions::with_rf(rf, periods))
}

pub(crate) fn annualization(periods: Option<u32>) -> f64 {
    f64::from(periods.unwrap_or(1)).sqrt()
}

// ─── Numeric helpers ────────────────────────────────────────────────

/// `num / den`, or `0.0` when the denominator vanishes or the result is not finite.
pub(crate) fn ratio(num: f64, den: f64) -> f64 {
    if den.abs() < EPSILON || den.is_nan() {
        return 0.0;
    }
    let out = num / den;
    if out.is_finite() {
        out
    } else {
        0.0
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the values satisfying `keep`; `0.0` for an empty subset.
pub(crate) fn mean_where(values: &[f64], keep: impl Fn(f64) -> bool) -> f64 {
    let subset: Vec<f64> = values.iter().copied().filter(|v| keep(*v)).collect();
    mean(&subset)
}

pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Sample covariance of two equally long slices.
pub(crate) fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (ma, mb) = (mean(&a[..n]), mean(&b[..n]));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Pearson correlation; `0.0` when either side has no variance.
pub(crate) fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    ratio(
        covariance(a, b),
        std_dev(&a[..n]) * std_dev(&b[..n]),
    )
}

/// Quantile with linear interpolation between the closest ranks.
pub(crate) fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
