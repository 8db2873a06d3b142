//! Benchmark-relative measures. Strategy and benchmark are prepared the same
//! way and inner-joined on their dates before any computation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_returns, Period};
use crate::error::Result;
use crate::prepare::{align, prepare_returns, PrepareOptions};
use crate::series::ReturnSeries;

use super::returns::compound;
use super::{covariance, mean, pearson, prepared, ratio, std_dev, variance};

/// Regression of strategy returns on benchmark returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub beta: f64,
    /// Annualized by `periods`.
    pub alpha: f64,
}

fn prepared_pair(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
    opts: &PrepareOptions,
) -> Result<(ReturnSeries, ReturnSeries)> {
    let r = prepare_returns(returns, opts)?;
    let b = prepare_returns(benchmark, opts)?;
    align(&r, &b)
}

fn plain_pair(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
) -> Result<(ReturnSeries, ReturnSeries)> {
    prepared_pair(returns, benchmark, &PrepareOptions::default())
}

fn beta_of(r: &[f64], b: &[f64]) -> f64 {
    ratio(covariance(r, b), variance(b))
}

/// Beta and annualized alpha: `beta = cov(r, b) / var(b)`,
/// `alpha = (mean(r) - beta · mean(b)) · periods`.
pub fn greeks(returns: &ReturnSeries, benchmark: &ReturnSeries, periods: u32) -> Result<Greeks> {
    let (r, b) = plain_pair(returns, benchmark)?;
    let beta = beta_of(r.values(), b.values());
    let alpha = (mean(r.values()) - beta * mean(b.values())) * f64::from(periods);
    Ok(Greeks { beta, alpha })
}

/// `cov(r, b) / var(b)` on sample moments.
pub fn beta(returns: &ReturnSeries, benchmark: &ReturnSeries) -> Result<f64> {
    let (r, b) = plain_pair(returns, benchmark)?;
    Ok(beta_of(r.values(), b.values()))
}

/// Jensen's alpha on excess returns: `mean(r - rf) - beta · mean(b - rf)`.
///
/// Without `periods`, `rf` is a per-period rate and alpha is per period.
/// With `periods`, `rf` is annual and alpha is annualized.
pub fn alpha(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
    rf: f64,
    periods: Option<u32>,
) -> Result<f64> {
    let (r, b) = prepared_pair(returns, benchmark, &PrepareOptions::with_rf(rf, periods))?;
    let beta = beta_of(r.values(), b.values());
    let per_period = mean(r.values()) - beta * mean(b.values());
    Ok(per_period * f64::from(periods.unwrap_or(1)))
}

/// Squared Pearson correlation of strategy on benchmark.
pub fn r_squared(returns: &ReturnSeries, benchmark: &ReturnSeries) -> Result<f64> {
    Ok(benchmark_correlation(returns, benchmark)?.powi(2))
}

/// Pearson correlation with the benchmark.
pub fn benchmark_correlation(returns: &ReturnSeries, benchmark: &ReturnSeries) -> Result<f64> {
    let (r, b) = plain_pair(returns, benchmark)?;
    Ok(pearson(r.values(), b.values()))
}

/// `mean(r - b) / std(r - b)`.
pub fn information_ratio(returns: &ReturnSeries, benchmark: &ReturnSeries) -> Result<f64> {
    let (r, b) = plain_pair(returns, benchmark)?;
    let diff: Vec<f64> = r.values().iter().zip(b.values()).map(|(x, y)| x - y).collect();
    Ok(ratio(mean(&diff), std_dev(&diff)))
}

/// `(comp - rf) / beta`, 0 when beta is 0.
pub fn treynor_ratio(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
    rf: f64,
    periods: u32,
) -> Result<f64> {
    let Greeks { beta, .. } = greeks(returns, benchmark, periods)?;
    let r = prepared(returns)?;
    Ok(ratio(compound(r.values()) - rf, beta))
}

/// One period of a strategy-versus-benchmark comparison, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub date: NaiveDate,
    pub benchmark: f64,
    pub returns: f64,
    /// `returns / benchmark`, 0 when the benchmark return is 0.
    pub multiplier: f64,
    /// Strategy at least matched the benchmark.
    pub won: bool,
}

/// Period-by-period comparison after aggregating both sides.
pub fn compare(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
    aggregate: Option<Period>,
    compounded: bool,
) -> Result<Vec<Comparison>> {
    let (r, b) = plain_pair(returns, benchmark)?;
    let r = aggregate_returns(&r, aggregate, compounded);
    let b = aggregate_returns(&b, aggregate, compounded);
    Ok(r
        .iter()
        .zip(b.values())
        .map(|((date, ret), bench)| Comparison {
            date,
            benchmark: bench * 100.0,
            returns: ret * 100.0,
            multiplier: ratio(ret, *bench),
            won: ret >= *bench,
        })
        .collect())
}
