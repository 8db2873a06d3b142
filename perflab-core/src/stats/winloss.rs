//! Trade-style ratios built from winning and losing periods.

use crate::aggregate::{aggregate_returns, Period};
use crate::error::Result;
use crate::prepare::{prepare_returns, PrepareOptions};
use crate::series::ReturnSeries;

use super::distribution::tail_ratio;
use super::returns::{check_quantile, win_rate_of};
use super::{mean_where, prepared, quantile, ratio};

/// Average win over the magnitude of the average loss.
pub fn payoff_ratio(returns: &ReturnSeries) -> Result<f64> {
    Ok(payoff_of(prepared(returns)?.values()))
}

fn payoff_of(values: &[f64]) -> f64 {
    let win = mean_where(values, |v| v >= 0.0);
    let loss = mean_where(values, |v| v < 0.0);
    ratio(win, loss.abs())
}

/// `|mean(wins) / count(wins)| / |mean(losses) / count(losses)|`.
pub fn profit_ratio(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    let v = r.values();
    let wins = v.iter().filter(|x| **x >= 0.0).count() as f64;
    let losses = v.iter().filter(|x| **x < 0.0).count() as f64;
    let win_ratio = ratio(mean_where(v, |x| x >= 0.0), wins).abs();
    let loss_ratio = ratio(mean_where(v, |x| x < 0.0), losses).abs();
    Ok(ratio(win_ratio, loss_ratio))
}

/// `|Σ r[r > 0]| / |Σ r[r < 0]|`.
pub fn profit_factor(returns: &ReturnSeries) -> Result<f64> {
    Ok(profit_factor_of(prepared(returns)?.values()))
}

fn profit_factor_of(values: &[f64]) -> f64 {
    let gains: f64 = values.iter().filter(|v| **v > 0.0).sum();
    let losses: f64 = values.iter().filter(|v| **v < 0.0).sum();
    ratio(gains.abs(), losses.abs())
}

/// Total return over the magnitude of total losses, after aggregating to
/// `resolution`. `rf` is subtracted per period as given.
pub fn gain_to_pain_ratio(
    returns: &ReturnSeries,
    rf: f64,
    resolution: Option<Period>,
) -> Result<f64> {
    let r = prepare_returns(returns, &PrepareOptions::with_rf(rf, None))?;
    let r = aggregate_returns(&r, resolution, true);
    let total: f64 = r.values().iter().sum();
    let pain: f64 = r.values().iter().filter(|v| **v < 0.0).sum();
    Ok(ratio(total, pain.abs()))
}

/// Profit factor × win rate × payoff ratio.
pub fn cpc_index(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    let v = r.values();
    Ok(profit_factor_of(v) * win_rate_of(v) * payoff_of(v))
}

/// Profit factor × tail ratio.
pub fn common_sense_ratio(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    Ok(profit_factor_of(r.values()) * tail_ratio(&r, 0.95)?)
}

/// `q`-quantile of all returns over the mean non-negative return.
pub fn outlier_win_ratio(returns: &ReturnSeries, q: f64) -> Result<f64> {
    check_quantile(q)?;
    let r = prepared(returns)?;
    let v = r.values();
    Ok(ratio(quantile(v, q), mean_where(v, |x| x >= 0.0)))
}

/// `q`-quantile of all returns over the mean negative return.
pub fn outlier_loss_ratio(returns: &ReturnSeries, q: f64) -> Result<f64> {
    check_quantile(q)?;
    let r = prepared(returns)?;
    let v = r.values();
    Ok(ratio(quantile(v, q), mean_where(v, |x| x < 0.0)))
}

/// Kelly fraction `(payoff · w - (1 - w)) / payoff`.
pub fn kelly_criterion(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    let v = r.values();
    let payoff = payoff_of(v);
    let w = win_rate_of(v);
    Ok(ratio(payoff * w - (1.0 - w), payoff))
}
