//! Risk-adjusted ratios: Sharpe family, Sortino family, growth and
//! drawdown-based ratios.

use statrs::distribution::ContinuousCDF;

use crate::drawdown::{max_drawdown, to_drawdown_series};
use crate::error::{Result, StatsError};
use crate::series::ReturnSeries;

use super::distribution::{kurtosis_of, parametric_cvar, skew_of, standard_normal};
use super::returns::compound;
use super::{annualization, mean, pearson, prepared, prepared_excess, ratio, std_dev, EPSILON};

// ─── Sharpe / Sortino ───────────────────────────────────────────────

/// `mean / std`, times `sqrt(periods)` when annualized.
///
/// A non-zero `rf` is an annual rate and requires `periods`.
pub fn sharpe(
    returns: &ReturnSeries,
    rf: f64,
    periods: Option<u32>,
    annualize: bool,
) -> Result<f64> {
    let r = prepared_excess(returns, rf, periods)?;
    Ok(scale(sharpe_of(r.values()), periods, annualize))
}

/// `mean / std(r[r < 0])`, times `sqrt(periods)` when annualized.
pub fn sortino(
    returns: &ReturnSeries,
    rf: f64,
    periods: Option<u32>,
    annualize: bool,
) -> Result<f64> {
    let r = prepared_excess(returns, rf, periods)?;
    Ok(scale(sortino_of(r.values()), periods, annualize))
}

/// Sortino divided by `√2`, comparable to Sharpe.
pub fn adjusted_sortino(
    returns: &ReturnSeries,
    rf: f64,
    periods: Option<u32>,
    annualize: bool,
) -> Result<f64> {
    Ok(sortino(returns, rf, periods, annualize)? / std::f64::consts::SQRT_2)
}

/// Sharpe penalized for first-order autocorrelation.
pub fn smart_sharpe(
    returns: &ReturnSeries,
    rf: f64,
    periods: Option<u32>,
    annualize: bool,
) -> Result<f64> {
    let r = prepared_excess(returns, rf, periods)?;
    let raw = sharpe_of(r.values()) / penalty_of(r.values());
    Ok(scale(raw, periods, annualize))
}

/// Sortino penalized for first-order autocorrelation.
pub fn smart_sortino(
    returns: &ReturnSeries,
    rf: f64,
    periods: Option<u32>,
    annualize: bool,
) -> Result<f64> {
    let r = prepared_excess(returns, rf, periods)?;
    let raw = sortino_of(r.values()) / penalty_of(r.values());
    Ok(scale(raw, periods, annualize))
}

/// `sqrt(1 + 2 Σ_{x=1}^{n-1} ((n - x) / n) ρ^x)` with `ρ` the absolute lag-1
/// autocorrelation. Always `>= 1`.
pub fn autocorr_penalty(returns: &ReturnSeries) -> Result<f64> {
    Ok(penalty_of(prepared(returns)?.values()))
}

fn penalty_of(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 1.0;
    }
    let coef = pearson(&values[..n - 1], &values[1..]).abs();
    let nf = n as f64;
    let sum: f64 = (1..n)
        .map(|x| ((nf - x as f64) / nf) * coef.powi(x as i32))
        .sum();
    (1.0 + 2.0 * sum).sqrt()
}

pub(crate) fn sharpe_of(values: &[f64]) -> f64 {
    ratio(mean(values), std_dev(values))
}

pub(crate) fn sortino_of(values: &[f64]) -> f64 {
    let downside: Vec<f64> = values.iter().copied().filter(|v| *v < 0.0).collect();
    ratio(mean(values), std_dev(&downside))
}

fn scale(raw: f64, periods: Option<u32>, annualize: bool) -> f64 {
    if annualize {
        raw * annualization(periods)
    } else {
        raw
    }
}

/// Probability that the true (per-period) Sharpe ratio exceeds
/// `target_sharpe`, given the sample length, skew and kurtosis.
///
/// `σ_SR = sqrt((1 + SR²/2 - skew·SR + (kurt - 3)/4 · SR²) / (n - 1))`,
/// result `Φ((SR - target) / σ_SR)`. Returns 0 when `σ_SR` is undefined.
pub fn probabilistic_sharpe_ratio(returns: &ReturnSeries, target_sharpe: f64) -> Result<f64> {
    let r = prepared(returns)?;
    let v = r.values();
    let n = v.len() as f64;
    if v.len() < 2 {
        return Ok(0.0);
    }
    let base = sharpe_of(v);
    let skew = skew_of(v);
    let kurt = kurtosis_of(v);
    let var = (1.0 + 0.5 * base.powi(2) - skew * base + (kurt - 3.0) / 4.0 * base.powi(2))
        / (n - 1.0);
    if var <= EPSILON || !var.is_finite() {
        return Ok(0.0);
    }
    let normal = standard_normal()?;
    Ok(normal.cdf((base - target_sharpe) / var.sqrt()))
}

/// Probability-weighted gains over losses relative to `required_return`
/// (annual, converted to a per-period threshold).
pub fn omega(
    returns: &ReturnSeries,
    rf: f64,
    required_return: f64,
    periods: u32,
) -> Result<f64> {
    if required_return <= -1.0 {
        return Err(StatsError::InvalidParameter {
            name: "required_return",
            reason: format!("{required_return} must exceed -1"),
        });
    }
    let r = prepared_excess(returns, rf, Some(periods))?;
    if r.len() < 2 {
        return Ok(0.0);
    }
    let threshold = if periods == 1 {
        required_return
    } else {
        (1.0 + required_return).powf(1.0 / f64::from(periods)) - 1.0
    };
    let (gains, losses) = r.values().iter().fold((0.0, 0.0), |(g, l), v| {
        let d = v - threshold;
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });
    Ok(ratio(gains, losses))
}

// ─── Growth and drawdown ratios ─────────────────────────────────────

/// Compound annual growth rate `(1 + total)^(periods / n) - 1`, with
/// `total` compounded or summed. A total loss of the capital gives `-1`.
pub fn cagr(returns: &ReturnSeries, rf: f64, compounded: bool, periods: u32) -> Result<f64> {
    let r = prepared_excess(returns, rf, Some(periods))?;
    Ok(cagr_of(r.values(), compounded, periods))
}

pub(crate) fn cagr_of(values: &[f64], compounded: bool, periods: u32) -> f64 {
    let total = if compounded {
        compound(values)
    } else {
        values.iter().sum()
    };
    let growth = 1.0 + total;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(f64::from(periods) / values.len() as f64) - 1.0
}

/// Risk-adjusted return: CAGR over market exposure.
pub fn rar(returns: &ReturnSeries, rf: f64, periods: u32) -> Result<f64> {
    let r = prepared_excess(returns, rf, Some(periods))?;
    let growth = cagr_of(r.values(), true, periods);
    Ok(ratio(growth, super::returns::exposure(&r)?))
}

/// CAGR over the magnitude of the maximum drawdown.
pub fn calmar(returns: &ReturnSeries, periods: u32) -> Result<f64> {
    let r = prepared(returns)?;
    Ok(ratio(cagr_of(r.values(), true, periods), max_drawdown(&r).abs()))
}

/// Return over maximum drawdown, on the annualized return.
pub fn romad(returns: &ReturnSeries, periods: u32) -> Result<f64> {
    calmar(returns, periods)
}

/// `sqrt(mean(dd²))` over the drawdown series.
pub fn ulcer_index(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    Ok(ulcer_of(&r))
}

fn ulcer_of(returns: &ReturnSeries) -> f64 {
    let dd = to_drawdown_series(returns);
    let squares: Vec<f64> = dd.values().iter().map(|v| v * v).collect();
    mean(&squares).sqrt()
}

/// `(comp - rf) / ulcer_index`.
pub fn ulcer_performance_index(returns: &ReturnSeries, rf: f64) -> Result<f64> {
    let r = prepared(returns)?;
    Ok(ratio(compound(r.values()) - rf, ulcer_of(&r)))
}

/// `(Σr - rf) / (ulcer · pitfall)` where `pitfall = -CVaR(dd) / std(r)`.
pub fn serenity_index(returns: &ReturnSeries, rf: f64) -> Result<f64> {
    let r = prepared(returns)?;
    let dd = to_drawdown_series(&r);
    let pitfall = ratio(-parametric_cvar(dd.values(), 1.0, 0.95)?, std_dev(r.values()));
    let total: f64 = r.values().iter().sum();
    Ok(ratio(total - rf, ulcer_of(&r) * pitfall))
}

/// `|comp - rf| / |max_drawdown|`.
pub fn recovery_factor(returns: &ReturnSeries, rf: f64) -> Result<f64> {
    let r = prepared(returns)?;
    Ok(ratio(
        (compound(r.values()) - rf).abs(),
        max_drawdown(&r).abs(),
    ))
}

/// `mean / std` without risk-free adjustment or annualization.
pub fn risk_return_ratio(returns: &ReturnSeries) -> Result<f64> {
    Ok(sharpe_of(prepared(returns)?.values()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> ReturnSeries {
        ReturnSeries::from_values("r", values.to_vec()).unwrap()
    }

    fn fixture() -> ReturnSeries {
        series(&[0.01, -0.02, 0.015, 0.03, 0.025])
    }

    // ── Sharpe ──

    #[test]
    fn sharpe_known_value() {
        let v = [0.01, -0.02, 0.015, 0.03, 0.025];
        let expected = mean(&v) / std_dev(&v) * 252.0_f64.sqrt();
        let s = sharpe(&fixture(), 0.0, Some(252), true).unwrap();
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn sharpe_requires_periods_with_rf() {
        let err = sharpe(&fixture(), 0.02, None, true).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn sharpe_constant_is_zero() {
        assert_eq!(sharpe(&series(&[0.01; 10]), 0.0, Some(252), true).unwrap(), 0.0);
    }

    #[test]
    fn sharpe_without_annualization() {
        let a = sharpe(&fixture(), 0.0, Some(252), true).unwrap();
        let b = sharpe(&fixture(), 0.0, Some(252), false).unwrap();
        assert!((a - b * 252.0_f64.sqrt()).abs() < 1e-12);
    }

    // ── Sortino ──

    #[test]
    fn sortino_uses_downside_std() {
        let v = [0.01, -0.02, 0.015, -0.03, 0.025];
        let down = [-0.02, -0.03];
        let expected = mean(&v) / std_dev(&down) * 252.0_f64.sqrt();
        let s = sortino(&series(&v), 0.0, Some(252), true).unwrap();
        assert!((s - expected).abs() < 1e-12);
        let adj = adjusted_sortino(&series(&v), 0.0, Some(252), true).unwrap();
        assert!((adj - expected / 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn sortino_without_losses_is_zero() {
        assert_eq!(sortino(&series(&[0.01, 0.02]), 0.0, Some(252), true).unwrap(), 0.0);
    }

    // ── Smart ratios ──

    #[test]
    fn penalty_is_at_least_one() {
        let p = autocorr_penalty(&series(&[0.01, 0.02, 0.03, 0.04, 0.05, 0.06])).unwrap();
        assert!(p > 1.0);
        assert_eq!(autocorr_penalty(&series(&[0.01, 0.02])).unwrap(), 1.0);
    }

    #[test]
    fn smart_sharpe_is_no_larger() {
        let s = fixture();
        let plain = sharpe(&s, 0.0, Some(252), true).unwrap();
        let smart = smart_sharpe(&s, 0.0, Some(252), true).unwrap();
        let penalty = autocorr_penalty(&s).unwrap();
        assert!((smart - plain / penalty).abs() < 1e-12);
        assert!(smart.abs() <= plain.abs());
        let smart_so = smart_sortino(&s, 0.0, Some(252), true).unwrap();
        let plain_so = sortino(&s, 0.0, Some(252), true).unwrap();
        assert!((smart_so - plain_so / penalty).abs() < 1e-12);
    }

    #[test]
    fn psr_is_a_probability() {
        let p = probabilistic_sharpe_ratio(&fixture(), 0.0).unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(probabilistic_sharpe_ratio(&series(&[0.01]), 0.0).unwrap(), 0.0);
    }

    // ── Omega ──

    #[test]
    fn omega_gains_over_losses() {
        let o = omega(&series(&[0.02, -0.01, 0.03, -0.02]), 0.0, 0.0, 252).unwrap();
        assert!((o - 0.05 / 0.03).abs() < 1e-12);
    }

    #[test]
    fn omega_without_losses_is_zero() {
        assert_eq!(omega(&series(&[0.02, 0.03]), 0.0, 0.0, 252).unwrap(), 0.0);
        assert!(omega(&fixture(), 0.0, -1.0, 252).is_err());
    }

    // ── CAGR and drawdown ratios ──

    #[test]
    fn cagr_constant_returns() {
        let c = cagr(&series(&[0.02; 5]), 0.0, true, 252).unwrap();
        let expected = 1.02_f64.powi(5).powf(252.0 / 5.0) - 1.0;
        assert!((c - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn cagr_summed() {
        let c = cagr(&series(&[0.01; 4]), 0.0, false, 4).unwrap();
        assert!((c - 0.04).abs() < 1e-12);
    }

    #[test]
    fn calmar_and_romad_agree() {
        let s = series(&[0.05, -0.10, 0.04, 0.03]);
        let c = calmar(&s, 252).unwrap();
        let expected = cagr(&s, 0.0, true, 252).unwrap() / 0.10;
        assert!((c - expected).abs() < 1e-9 * expected.abs());
        assert_eq!(romad(&s, 252).unwrap(), c);
    }

    #[test]
    fn calmar_without_drawdown_is_zero() {
        assert_eq!(calmar(&series(&[0.01, 0.02]), 252).unwrap(), 0.0);
    }

    #[test]
    fn ulcer_index_root_mean_square() {
        // dd = [0, -0.1, 0]
        let s = series(&[0.1, -0.1, 1.0 / 9.0 + 0.01]);
        let u = ulcer_index(&s).unwrap();
        let dd = to_drawdown_series(&s);
        let expected = (dd.values().iter().map(|v| v * v).sum::<f64>() / 3.0).sqrt();
        assert!((u - expected).abs() < 1e-12);
        assert!(u > 0.0);
    }

    #[test]
    fn ulcer_family_without_drawdown() {
        let s = series(&[0.01, 0.02]);
        assert_eq!(ulcer_index(&s).unwrap(), 0.0);
        assert_eq!(ulcer_performance_index(&s, 0.0).unwrap(), 0.0);
        assert_eq!(serenity_index(&s, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn recovery_factor_formula() {
        let s = series(&[0.05, -0.10, 0.04, 0.03]);
        let total: f64 = 1.05 * 0.9 * 1.04 * 1.03 - 1.0;
        let r = recovery_factor(&s, 0.0).unwrap();
        assert!((r - total.abs() / 0.10).abs() < 1e-12);
    }

    #[test]
    fn rar_divides_by_exposure() {
        let s = series(&[0.0, 0.02, 0.0, 0.01]);
        let expected = cagr(&s, 0.0, true, 252).unwrap() / 0.5;
        let r = rar(&s, 0.0, 252).unwrap();
        assert!((r - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn risk_return_is_unannualized_sharpe() {
        let rr = risk_return_ratio(&fixture()).unwrap();
        let s = sharpe(&fixture(), 0.0, None, false).unwrap();
        assert_eq!(rr, s);
    }
}
