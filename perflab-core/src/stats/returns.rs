//! Simple return statistics: totals, averages, extremes, streaks, volatility.

use crate::aggregate::{aggregate_returns, Period};
use crate::error::{Result, StatsError};
use crate::prepare::log_returns;
use crate::series::ReturnSeries;

use super::{annualization, mean, mean_where, prepared, quantile, ratio, std_dev};

/// Total compounded return `Π(1 + r) - 1`.
pub fn comp(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    Ok(compound(r.values()))
}

pub(crate) fn compound(values: &[f64]) -> f64 {
    values.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Geometric mean return per (optionally aggregated) period.
pub fn expected_return(
    returns: &ReturnSeries,
    aggregate: Option<Period>,
    compounded: bool,
) -> Result<f64> {
    let r = aggregate_returns(&prepared(returns)?, aggregate, compounded);
    let growth = r.values().iter().fold(1.0, |acc, v| acc * (1.0 + v));
    Ok(growth.powf(1.0 / r.len() as f64) - 1.0)
}

/// Best period return.
pub fn best(returns: &ReturnSeries, aggregate: Option<Period>, compounded: bool) -> Result<f64> {
    let r = aggregate_returns(&prepared(returns)?, aggregate, compounded);
    Ok(r.values().iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Worst period return.
pub fn worst(returns: &ReturnSeries, aggregate: Option<Period>, compounded: bool) -> Result<f64> {
    let r = aggregate_returns(&prepared(returns)?, aggregate, compounded);
    Ok(r.values().iter().copied().fold(f64::INFINITY, f64::min))
}

/// Running streak length: position `i` holds the number of consecutive
/// `true` flags ending at `i` (0 where the flag is false).
pub fn count_consecutive(flags: &[bool]) -> Vec<usize> {
    let mut current = 0;
    flags
        .iter()
        .map(|&f| {
            current = if f { current + 1 } else { 0 };
            current
        })
        .collect()
}

/// Longest run of positive period returns.
pub fn consecutive_wins(
    returns: &ReturnSeries,
    aggregate: Option<Period>,
    compounded: bool,
) -> Result<usize> {
    longest_streak(returns, aggregate, compounded, |v| v > 0.0)
}

/// Longest run of negative period returns.
pub fn consecutive_losses(
    returns: &ReturnSeries,
    aggregate: Option<Period>,
    compounded: bool,
) -> Result<usize> {
    longest_streak(returns, aggregate, compounded, |v| v < 0.0)
}

fn longest_streak(
    returns: &ReturnSeries,
    aggregate: Option<Period>,
    compounded: bool,
    hit: impl Fn(f64) -> bool,
) -> Result<usize> {
    let r = aggregate_returns(&prepared(returns)?, aggregate, compounded);
    let flags: Vec<bool> = r.values().iter().map(|v| hit(*v)).collect();
    Ok(count_consecutive(&flags).into_iter().max().unwrap_or(0))
}

/// Share of periods with a non-zero return, rounded up to whole percent.
pub fn exposure(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    let active = r.values().iter().filter(|v| **v != 0.0).count();
    let share = active as f64 / r.len() as f64;
    Ok((share * 100.0).ceil() / 100.0)
}

/// `count(r > 0) / count(r != 0)`, 0 when every return is zero.
pub fn win_rate(returns: &ReturnSeries, aggregate: Option<Period>, compounded: bool) -> Result<f64> {
    let r = aggregate_returns(&prepared(returns)?, aggregate, compounded);
    Ok(win_rate_of(r.values()))
}

pub(crate) fn win_rate_of(values: &[f64]) -> f64 {
    let wins = values.iter().filter(|v| **v > 0.0).count();
    let active = values.iter().filter(|v| **v != 0.0).count();
    ratio(wins as f64, active as f64)
}

/// Mean of the non-zero returns.
pub fn avg_return(returns: &ReturnSeries) -> Result<f64> {
    Ok(mean_where(prepared(returns)?.values(), |v| v != 0.0))
}

/// Mean of the non-negative returns.
pub fn avg_win(returns: &ReturnSeries) -> Result<f64> {
    Ok(mean_where(prepared(returns)?.values(), |v| v >= 0.0))
}

/// Mean of the negative returns.
pub fn avg_loss(returns: &ReturnSeries) -> Result<f64> {
    Ok(mean_where(prepared(returns)?.values(), |v| v < 0.0))
}

/// Standard deviation of returns, scaled by `sqrt(periods)` when annualized.
pub fn volatility(returns: &ReturnSeries, periods: Option<u32>, annualize: bool) -> Result<f64> {
    let std = std_dev(prepared(returns)?.values());
    Ok(if annualize {
        std * annualization(periods)
    } else {
        std
    })
}

/// Volatility of log returns.
pub fn implied_volatility(
    returns: &ReturnSeries,
    periods: Option<u32>,
    annualize: bool,
) -> Result<f64> {
    let logret = log_returns(&prepared(returns)?);
    let std = std_dev(logret.values());
    Ok(if annualize {
        std * annualization(periods)
    } else {
        std
    })
}

/// Returns strictly above the `q` quantile. `None` when nothing qualifies.
pub fn outliers(returns: &ReturnSeries, q: f64) -> Result<Option<ReturnSeries>> {
    check_quantile(q)?;
    let r = prepared(returns)?;
    let cut = quantile(r.values(), q);
    Ok(r.filter(|_, v| v > cut))
}

/// Returns strictly below the `q` quantile. `None` when nothing qualifies.
pub fn remove_outliers(returns: &ReturnSeries, q: f64) -> Result<Option<ReturnSeries>> {
    check_quantile(q)?;
    let r = prepared(returns)?;
    let cut = quantile(r.values(), q);
    Ok(r.filter(|_, v| v < cut))
}

pub(crate) fn check_quantile(q: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&q) {
        return Err(StatsError::InvalidParameter {
            name: "quantile",
            reason: format!("{q} is outside [0, 1]"),
        });
    }
    Ok(())
}

/// Arithmetic mean of all returns.
pub fn mean_return(returns: &ReturnSeries) -> Result<f64> {
    Ok(mean(prepared(returns)?.values()))
}
