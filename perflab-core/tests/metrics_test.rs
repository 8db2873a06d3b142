//! Integration tests for the metrics library against closed-form fixtures.

use perflab_core::drawdown::{drawdown_details, DrawdownSeries};
use perflab_core::frame::{ReturnFrame, Returns};
use perflab_core::prepare::{align, prepare_returns, PrepareOptions};
use perflab_core::series::{synthetic_index, PriceSeries, ReturnSeries};
use perflab_core::stats;
use perflab_core::StatsError;

// ── Helpers ──────────────────────────────────────────────────────────

fn series(name: &str, values: &[f64]) -> ReturnSeries {
    ReturnSeries::from_values(name, values.to_vec()).unwrap()
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

fn sample_cov(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / (a.len() - 1) as f64
}

const PORTFOLIO: [f64; 5] = [0.01, 0.02, 0.015, 0.03, 0.025];
const BENCHMARK: [f64; 5] = [0.008, 0.018, 0.013, 0.028, 0.022];

// ── Ratios ───────────────────────────────────────────────────────────

#[test]
fn sharpe_matches_mean_over_std() {
    let v = [0.01, -0.02, 0.015, 0.03, 0.025];
    let std = sample_cov(&v, &v).sqrt();
    let expected = mean(&v) / std * 252.0_f64.sqrt();
    let got = stats::sharpe(&series("s", &v), 0.0, Some(252), true).unwrap();
    assert!((got - expected).abs() < 1e-12, "got {got}, expected {expected}");
}

#[test]
fn sharpe_with_rf_needs_periods() {
    let err = stats::sharpe(&series("s", &PORTFOLIO), 0.03, None, true).unwrap_err();
    assert!(matches!(err, StatsError::MissingPeriods));
}

#[test]
fn cagr_of_constant_returns() {
    let got = stats::cagr(&series("s", &[0.02; 5]), 0.0, true, 252).unwrap();
    let expected = (1.02_f64.powi(5)).powf(252.0 / 5.0) - 1.0;
    let total = stats::comp(&series("s", &[0.02; 5])).unwrap();
    let recomputed = (1.0 + total).powf(252.0 / 5.0) - 1.0;
    assert!((got - expected).abs() < 1e-9 * expected);
    assert!((got - recomputed).abs() < 1e-9 * expected);
}

#[test]
fn kelly_matches_formula() {
    let s = series("s", &[0.02, -0.01, 0.03, -0.02, 0.01, 0.0]);
    let payoff = stats::payoff_ratio(&s).unwrap();
    let w = stats::win_rate(&s, None, true).unwrap();
    let expected = (payoff * w - (1.0 - w)) / payoff;
    assert!((stats::kelly_criterion(&s).unwrap() - expected).abs() < 1e-12);
}

// ── Benchmark-relative ───────────────────────────────────────────────

#[test]
fn beta_matches_covariance_over_variance() {
    let expected = sample_cov(&PORTFOLIO, &BENCHMARK) / sample_cov(&BENCHMARK, &BENCHMARK);
    let got = stats::beta(&series("p", &PORTFOLIO), &series("b", &BENCHMARK)).unwrap();
    assert!((got - expected).abs() < 1e-4);
}

#[test]
fn alpha_matches_manual_excess_computation() {
    let rf = 0.001;
    let p: Vec<f64> = PORTFOLIO.iter().map(|v| v - rf).collect();
    let b: Vec<f64> = BENCHMARK.iter().map(|v| v - rf).collect();
    let beta = sample_cov(&p, &b) / sample_cov(&b, &b);
    let expected = mean(&p) - beta * mean(&b);
    let got = stats::alpha(&series("p", &PORTFOLIO), &series("b", &BENCHMARK), rf, None).unwrap();
    assert!((got - expected).abs() < 1e-4, "got {got}, expected {expected}");
}

#[test]
fn alpha_on_negative_and_mixed_returns() {
    let rf = 0.001;
    for sign in [[-1.0; 5], [1.0, -1.0, 1.0, -1.0, 1.0]] {
        let p: Vec<f64> = PORTFOLIO.iter().zip(sign).map(|(v, s)| v * s).collect();
        let b: Vec<f64> = BENCHMARK.iter().zip(sign).map(|(v, s)| v * s).collect();
        let pe: Vec<f64> = p.iter().map(|v| v - rf).collect();
        let be: Vec<f64> = b.iter().map(|v| v - rf).collect();
        let beta = sample_cov(&pe, &be) / sample_cov(&be, &be);
        let expected = mean(&pe) - beta * mean(&be);
        let got = stats::alpha(&series("p", &p), &series("b", &b), rf, None).unwrap();
        assert!((got - expected).abs() < 1e-4);
    }
}

#[test]
fn partially_overlapping_benchmark_aligns() {
    let idx = synthetic_index(8);
    let r = ReturnSeries::new("r", idx[..6].to_vec(), vec![0.01, 0.02, -0.01, 0.0, 0.01, 0.02])
        .unwrap();
    let b = ReturnSeries::new("b", idx[3..].to_vec(), vec![0.005, -0.01, 0.002, 0.03, 0.01])
        .unwrap();
    let (ra, rb) = align(&r, &b).unwrap();
    assert_eq!(ra.len(), rb.len());
    assert_eq!(ra.dates(), rb.dates());
    assert_eq!(ra.dates(), &idx[3..6]);
}

// ── Validation ───────────────────────────────────────────────────────

#[test]
fn non_numeric_input_is_a_validation_error() {
    let err = ReturnSeries::parse_values("p", &["a", "b", "c"]).unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err, StatsError::NonNumeric { position: 0, .. }));
}

#[test]
fn empty_input_is_a_validation_error() {
    let err = ReturnSeries::from_values("p", vec![]).unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err, StatsError::EmptySeries { .. }));
}

#[test]
fn win_rate_without_active_periods_is_zero() {
    let w = stats::win_rate(&series("s", &[0.0; 6]), None, true).unwrap();
    assert_eq!(w, 0.0);
}

// ── Drawdown and round-trip ──────────────────────────────────────────

#[test]
fn all_zero_drawdown_has_no_episodes() {
    let dd = DrawdownSeries::new("dd", synthetic_index(20), vec![0.0; 20]).unwrap();
    assert!(drawdown_details(&dd).is_empty());
}

#[test]
fn prices_round_trip_through_returns() {
    let prices = PriceSeries::new("p", synthetic_index(4), vec![100.0, 105.0, 99.75, 110.0])
        .unwrap();
    let returns = prices.to_returns_from(100.0);
    let back = returns.to_prices(100.0).unwrap();
    for (a, b) in back.prices().iter().zip(prices.prices()) {
        assert!((a - b).abs() < 1e-9);
    }
}

// ── Single vs Multi ──────────────────────────────────────────────────

#[test]
fn multi_evaluation_matches_single_calls() {
    let a = series("a", &PORTFOLIO);
    let b = series("b", &[0.01, -0.02, 0.015, 0.03, 0.025]);
    let frame = Returns::from(ReturnFrame::from_columns(vec![a.clone(), b.clone()]).unwrap());
    let sortinos = frame
        .try_evaluate(|s| stats::sortino(s, 0.0, Some(252), true))
        .unwrap();
    assert_eq!(
        sortinos.get("b").copied(),
        Some(stats::sortino(&b, 0.0, Some(252), true).unwrap())
    );
    assert_eq!(
        sortinos.get("a").copied(),
        Some(stats::sortino(&a, 0.0, Some(252), true).unwrap())
    );
}

#[test]
fn prepared_input_is_not_adjusted_twice() {
    let raw = series("s", &PORTFOLIO);
    let opts = PrepareOptions::with_rf(0.05, Some(252));
    let once = prepare_returns(&raw, &opts).unwrap();
    let a = stats::sharpe(&once, 0.0, Some(252), true).unwrap();
    let b = stats::sharpe(&raw, 0.05, Some(252), true).unwrap();
    assert!((a - b).abs() < 1e-12);
    let again = stats::sharpe(&once, 0.05, Some(252), true).unwrap();
    assert!((again - b).abs() < 1e-12);
}

#[test]
fn rate_passed_after_plain_preparation_is_applied() {
    let raw = series("s", &[0.01, -0.02, 0.015, 0.03, 0.025]);
    let clean = prepare_returns(&raw, &PrepareOptions::default()).unwrap();

    let without = stats::sharpe(&clean, 0.0, Some(252), true).unwrap();
    let with = stats::sharpe(&clean, 0.5, Some(252), true).unwrap();
    let direct = stats::sharpe(&raw, 0.5, Some(252), true).unwrap();
    assert!(with < without);
    assert!((with - direct).abs() < 1e-12, "got {with}, expected {direct}");

    let sortino = stats::sortino(&clean, 0.5, Some(252), true).unwrap();
    assert!((sortino - stats::sortino(&raw, 0.5, Some(252), true).unwrap()).abs() < 1e-12);
}

#[test]
fn conflicting_rate_on_adjusted_input_is_rejected() {
    let raw = series("s", &PORTFOLIO);
    let once = prepare_returns(&raw, &PrepareOptions::with_rf(0.05, Some(252))).unwrap();
    let err = stats::sharpe(&once, 0.02, Some(252), true).unwrap_err();
    assert!(matches!(err, StatsError::RiskFreeConflict { .. }));
    assert!(err.is_configuration());
}
