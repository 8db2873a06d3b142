//! Rolling-window metrics. Each output value is labelled with the last date
//! of its window; only full windows are emitted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};
use crate::prepare::align;
use crate::series::ReturnSeries;

use super::ratios::{sharpe_of, sortino_of};
use super::{annualization, mean, pearson, prepared, prepared_excess, ratio, std_dev};

fn check_window(window: usize) -> Result<()> {
    if window < 2 {
        return Err(StatsError::InvalidParameter {
            name: "window",
            reason: format!("rolling window must span at least 2 periods, got {window}"),
        });
    }
    Ok(())
}

fn rolling(
    series: &ReturnSeries,
    window: usize,
    f: impl Fn(&[f64]) -> f64,
) -> Vec<(NaiveDate, f64)> {
    series
        .values()
        .windows(window)
        .zip(series.dates().get(window - 1..).unwrap_or_default())
        .map(|(w, date)| (*date, f(w)))
        .collect()
}

/// Annualized standard deviation over a trailing window.
pub fn rolling_volatility(
    returns: &ReturnSeries,
    window: usize,
    periods: Option<u32>,
) -> Result<Vec<(NaiveDate, f64)>> {
    check_window(window)?;
    let r = prepared(returns)?;
    let scale = annualization(periods);
    Ok(rolling(&r, window, |w| std_dev(w) * scale))
}

/// Annualized Sharpe ratio over a trailing window.
pub fn rolling_sharpe(
    returns: &ReturnSeries,
    rf: f64,
    window: usize,
    periods: Option<u32>,
) -> Result<Vec<(NaiveDate, f64)>> {
    check_window(window)?;
    let r = prepared_excess(returns, rf, periods)?;
    let scale = annualization(periods);
    Ok(rolling(&r, window, |w| sharpe_of(w) * scale))
}

/// Annualized Sortino ratio over a trailing window.
pub fn rolling_sortino(
    returns: &ReturnSeries,
    rf: f64,
    window: usize,
    periods: Option<u32>,
) -> Result<Vec<(NaiveDate, f64)>> {
    check_window(window)?;
    let r = prepared_excess(returns, rf, periods)?;
    let scale = annualization(periods);
    Ok(rolling(&r, window, |w| sortino_of(w) * scale))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingGreeks {
    pub date: NaiveDate,
    /// Clipped to `[-1, 1]`.
    pub beta: f64,
    pub alpha: f64,
}

/// Trailing-window beta (`corr · σ_r / σ_b`, clipped to `[-1, 1]`) and the
/// alpha implied against full-sample means.
pub fn rolling_greeks(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
    window: usize,
) -> Result<Vec<RollingGreeks>> {
    check_window(window)?;
    let (r, b) = align(&prepared(returns)?, &prepared(benchmark)?)?;
    let (rv, bv) = (r.values(), b.values());
    let (mean_r, mean_b) = (mean(rv), mean(bv));
    Ok(rv
        .windows(window)
        .zip(bv.windows(window))
        .zip(r.dates().get(window - 1..).unwrap_or_default())
        .map(|((wr, wb), date)| {
            let beta = ratio(pearson(wr, wb) * std_dev(wr), std_dev(wb)).clamp(-1.0, 1.0);
            RollingGreeks {
                date: *date,
                beta,
                alpha: mean_r - beta * mean_b,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(name: &str, values: &[f64]) -> ReturnSeries {
        ReturnSeries::from_values(name, values.to_vec()).unwrap()
    }

    #[test]
    fn window_labels_and_count() {
        let s = series("r", &[0.01, -0.02, 0.015, 0.03, 0.025]);
        let v = rolling_volatility(&s, 3, Some(252)).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].0, s.dates()[2]);
        let expected = std_dev(&[0.01, -0.02, 0.015]) * 252.0_f64.sqrt();
        assert!((v[0].1 - expected).abs() < 1e-12);
    }

    #[test]
    fn window_longer_than_series_is_empty() {
        let s = series("r", &[0.01, 0.02]);
        assert!(rolling_sharpe(&s, 0.0, 5, Some(252)).unwrap().is_empty());
    }

    #[test]
    fn window_must_be_at_least_two() {
        let s = series("r", &[0.01, 0.02]);
        assert!(rolling_sortino(&s, 0.0, 1, Some(252)).is_err());
    }

    #[test]
    fn rolling_sharpe_last_window_matches_direct() {
        let vals = [0.01, -0.02, 0.015, 0.03, 0.025, -0.005];
        let s = series("r", &vals);
        let rs = rolling_sharpe(&s, 0.0, 4, Some(252)).unwrap();
        let direct = sharpe_of(&vals[2..]) * 252.0_f64.sqrt();
        assert!((rs.last().unwrap().1 - direct).abs() < 1e-12);
    }

    #[test]
    fn rolling_beta_is_clipped() {
        let b = series("b", &[0.01, -0.01, 0.02, -0.02, 0.01]);
        let r = series("r", &[0.03, -0.03, 0.06, -0.06, 0.03]);
        let g = rolling_greeks(&r, &b, 3).unwrap();
        assert_eq!(g.len(), 3);
        assert!(g.iter().all(|x| (x.beta - 1.0).abs() < 1e-12));
    }
}
