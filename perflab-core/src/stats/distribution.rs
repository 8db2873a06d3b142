//! Distribution-shape and tail-risk metrics: skew, kurtosis, parametric
//! VaR/CVaR, tail ratio, risk of ruin.
//!
//! VaR and CVaR use the variance-covariance (normal) approximation of the
//! return distribution.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::{Result, StatsError};
use crate::series::ReturnSeries;

use super::returns::{check_quantile, win_rate_of};
use super::{mean, prepared, quantile, ratio, std_dev};

/// Bias-corrected sample skewness. 0 below three observations or without variance.
pub fn skew(returns: &ReturnSeries) -> Result<f64> {
    Ok(skew_of(prepared(returns)?.values()))
}

/// Bias-corrected excess kurtosis. 0 below four observations or without variance.
pub fn kurtosis(returns: &ReturnSeries) -> Result<f64> {
    Ok(kurtosis_of(prepared(returns)?.values()))
}

pub(crate) fn skew_of(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return 0.0;
    }
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 < super::EPSILON {
        return 0.0;
    }
    (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
}

pub(crate) fn kurtosis_of(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return 0.0;
    }
    let m = mean(values);
    let s2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    let s4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>();
    if s2 < super::EPSILON {
        return 0.0;
    }
    let scale = (n + 1.0) * n * (n - 1.0) / ((n - 2.0) * (n - 3.0));
    let shift = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    scale * s4 / (s2 * s2) - shift
}

/// Daily value at risk: `Φ⁻¹(1 - confidence) * σ - μ`, with `σ` scaled by
/// `sigma`. A confidence above 1 is read as a percentage.
pub fn value_at_risk(returns: &ReturnSeries, sigma: f64, confidence: f64) -> Result<f64> {
    parametric_var(prepared(returns)?.values(), sigma, confidence)
}

/// Expected shortfall beyond the VaR level under the normal approximation:
/// `-(1/c) * φ(Φ⁻¹(c)) * σ - μ` with `c = 1 - confidence`.
pub fn conditional_value_at_risk(
    returns: &ReturnSeries,
    sigma: f64,
    confidence: f64,
) -> Result<f64> {
    parametric_cvar(prepared(returns)?.values(), sigma, confidence)
}

pub(crate) fn parametric_var(values: &[f64], sigma: f64, confidence: f64) -> Result<f64> {
    let c = tail_probability(confidence)?;
    let normal = standard_normal()?;
    Ok(normal.inverse_cdf(c) * sigma * std_dev(values) - mean(values))
}

pub(crate) fn parametric_cvar(values: &[f64], sigma: f64, confidence: f64) -> Result<f64> {
    let c = tail_probability(confidence)?;
    let normal = standard_normal()?;
    let density = normal.pdf(normal.inverse_cdf(c));
    Ok(-(1.0 / c) * density * sigma * std_dev(values) - mean(values))
}

/// `1 - confidence`, after reading `confidence > 1` as a percentage.
fn tail_probability(confidence: f64) -> Result<f64> {
    let confidence = if confidence > 1.0 {
        confidence / 100.0
    } else {
        confidence
    };
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(StatsError::InvalidParameter {
            name: "confidence",
            reason: format!("{confidence} must lie strictly between 0 and 1"),
        });
    }
    Ok(1.0 - confidence)
}

pub(crate) fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|err| StatsError::InvalidParameter {
        name: "normal",
        reason: err.to_string(),
    })
}

/// `|q(cutoff) / q(1 - cutoff)|`: right tail against left tail.
pub fn tail_ratio(returns: &ReturnSeries, cutoff: f64) -> Result<f64> {
    check_quantile(cutoff)?;
    let r = prepared(returns)?;
    let v = r.values();
    Ok(ratio(quantile(v, cutoff), quantile(v, 1.0 - cutoff)).abs())
}

/// `((1 - w) / (1 + w))^n` with `w` the win rate and `n` the observation count.
pub fn risk_of_ruin(returns: &ReturnSeries) -> Result<f64> {
    let r = prepared(returns)?;
    let w = win_rate_of(r.values());
    Ok(((1.0 - w) / (1.0 + w)).powf(r.len() as f64))
}
