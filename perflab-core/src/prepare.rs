//! Return preparation: turning raw input into the canonical return series.
//!
//! Every metric consumes prepared returns. Preparation:
//! 1. detects price-like input (`min >= 0 && max > 1`) and converts it to
//!    percentage changes,
//! 2. replaces `±Inf` with NaN, trims NaN from head and tail, and fills the
//!    remaining interior NaN with 0,
//! 3. subtracts the risk-free rate (scalar annual rate or per-period series).
//!
//! Prepared series carry a flag and remember the risk-free rate that was
//! subtracted from them. Preparing again only applies a rate the series does
//! not carry yet; the same rate is never subtracted twice, and a different
//! rate on top of an applied one is a configuration error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, StatsError};
use crate::series::{PriceSeries, ReturnSeries};

/// Risk-free rate used for excess returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskFree {
    /// Annualized scalar rate. Converted to a per-period rate with
    /// `(1 + rf)^(1/periods) - 1` when periods are known.
    Annual(f64),
    /// Per-period rates, subtracted date by date.
    Series(ReturnSeries),
}

impl Default for RiskFree {
    fn default() -> Self {
        RiskFree::Annual(0.0)
    }
}

impl From<f64> for RiskFree {
    fn from(rate: f64) -> Self {
        RiskFree::Annual(rate)
    }
}

impl RiskFree {
    pub fn is_zero(&self) -> bool {
        matches!(self, RiskFree::Annual(r) if *r == 0.0)
    }

    /// The scalar rate, when this is one.
    pub fn annual(&self) -> Option<f64> {
        match self {
            RiskFree::Annual(r) => Some(*r),
            RiskFree::Series(_) => None,
        }
    }
}

/// The risk-free rate already subtracted from a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRiskFree {
    pub rf: RiskFree,
    /// Periodicity used to de-annualize a scalar rate.
    pub periods: Option<u32>,
}

impl AppliedRiskFree {
    /// Whether subtracting `rf` at `periods` would repeat this adjustment.
    pub fn matches(&self, rf: &RiskFree, periods: Option<u32>) -> bool {
        self.rf == *rf && (matches!(rf, RiskFree::Series(_)) || self.periods == periods)
    }
}

/// Options controlling [`prepare_returns`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOptions {
    pub rf: RiskFree,
    /// Periods per year; needed to de-annualize a scalar `rf`.
    pub periods: Option<u32>,
    /// Drop NaN observations at the head and tail.
    pub trim_nan: bool,
    /// Convert price-like input to returns.
    pub detect_prices: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            rf: RiskFree::default(),
            periods: None,
            trim_nan: true,
            detect_prices: true,
        }
    }
}

impl PrepareOptions {
    pub fn with_rf(rf: impl Into<RiskFree>, periods: Option<u32>) -> Self {
        Self {
            rf: rf.into(),
            periods,
            ..Self::default()
        }
    }
}

/// Rejects a non-zero risk-free rate without a periodicity, and a zero
/// periodicity.
pub fn require_periods(rf: f64, periods: Option<u32>) -> Result<()> {
    match periods {
        Some(0) => Err(StatsError::InvalidPeriods),
        None if rf != 0.0 => Err(StatsError::MissingPeriods),
        _ => Ok(()),
    }
}

/// Produce the canonical return series. See the module docs for the steps.
pub fn prepare_returns(series: &ReturnSeries, opts: &PrepareOptions) -> Result<ReturnSeries> {
    if series.is_prepared() {
        trace!(series = series.name(), "already prepared, reconciling risk-free rate");
        return to_excess_returns(series, &opts.rf, opts.periods);
    }

    let mut values: Vec<f64> = series.values().to_vec();

    if opts.detect_prices && looks_like_prices(&values) {
        debug!(series = series.name(), "input looks like prices, converting to returns");
        values = pct_change(&values);
    }

    for v in values.iter_mut() {
        if v.is_infinite() {
            *v = f64::NAN;
        }
    }

    let (from, to) = if opts.trim_nan {
        let first = values.iter().position(|v| !v.is_nan());
        let last = values.iter().rposition(|v| !v.is_nan());
        match (first, last) {
            (Some(f), Some(l)) => (f, l + 1),
            _ => {
                return Err(StatsError::EmptySeries {
                    series: series.name().to_string(),
                })
            }
        }
    } else {
        (0, values.len())
    };
    if from > 0 || to < values.len() {
        debug!(
            series = series.name(),
            dropped = values.len() - (to - from),
            "trimmed NaN head/tail"
        );
    }

    let dates = series.dates()[from..to].to_vec();
    let values: Vec<f64> = values[from..to]
        .iter()
        .map(|v| if v.is_nan() { 0.0 } else { *v })
        .collect();

    let cleaned =
        ReturnSeries::from_parts_unchecked(series.name().to_string(), dates, values, false);
    let excess = to_excess_returns(&cleaned, &opts.rf, opts.periods)?;
    Ok(excess.into_prepared())
}

/// Prices to prepared returns.
pub fn prepare_prices(prices: &PriceSeries, opts: &PrepareOptions) -> Result<ReturnSeries> {
    let returns = prices.to_returns();
    let opts = PrepareOptions {
        detect_prices: false,
        ..opts.clone()
    };
    prepare_returns(&returns, &opts)
}

/// Subtract the risk-free rate.
///
/// A scalar rate with `periods` is de-annualized first; without `periods` it
/// is subtracted as given, and `periods = Some(0)` is rejected. A series rate
/// must cover every date of `returns`.
///
/// The result remembers the rate. Applying the rate a series already carries
/// returns it unchanged; applying a different one is an error.
pub fn to_excess_returns(
    returns: &ReturnSeries,
    rf: &RiskFree,
    periods: Option<u32>,
) -> Result<ReturnSeries> {
    if rf.is_zero() {
        return Ok(returns.clone());
    }
    if let Some(applied) = returns.risk_free() {
        if applied.matches(rf, periods) {
            trace!(series = returns.name(), "risk-free rate already applied");
            return Ok(returns.clone());
        }
        return Err(StatsError::RiskFreeConflict {
            series: returns.name().to_string(),
        });
    }

    let values: Vec<f64> = match rf {
        RiskFree::Annual(rate) => {
            let per_period = match periods {
                Some(0) => return Err(StatsError::InvalidPeriods),
                Some(p) => (1.0 + rate).powf(1.0 / f64::from(p)) - 1.0,
                None => *rate,
            };
            returns.values().iter().map(|r| r - per_period).collect()
        }
        RiskFree::Series(rates) => returns
            .iter()
            .map(|(date, r)| match rates.get(date) {
                Some(rate) => Ok(r - rate),
                None => Err(StatsError::RiskFreeAlignment { date }),
            })
            .collect::<Result<Vec<f64>>>()?,
    };
    debug!(series = returns.name(), "subtracted risk-free rate");
    Ok(returns
        .derived(returns.dates().to_vec(), values)
        .with_risk_free(AppliedRiskFree {
            rf: rf.clone(),
            periods,
        }))
}

/// Inner-join a strategy and a benchmark on their dates.
///
/// Both outputs share an identical index. An empty intersection is a
/// validation error.
pub fn align(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
) -> Result<(ReturnSeries, ReturnSeries)> {
    let common = intersect_dates(returns.dates(), benchmark.dates());
    if common.is_empty() {
        return Err(StatsError::BenchmarkAlignment {
            series: returns.name().to_string(),
            reason: "no common dates".into(),
        });
    }
    let dropped = returns.len() + benchmark.len() - 2 * common.len();
    if dropped > 0 {
        debug!(
            series = returns.name(),
            benchmark = benchmark.name(),
            kept = common.len(),
            dropped,
            "aligned benchmark by inner join"
        );
    }
    Ok((
        reindex(returns, &common),
        reindex(benchmark, &common),
    ))
}

/// Trim both series to start at the later of their first non-zero
/// observations. All-zero series start at their first date.
pub fn match_dates(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
) -> Result<(ReturnSeries, ReturnSeries)> {
    let start = first_active_date(returns).max(first_active_date(benchmark));
    let trimmed = returns.slice_from(start).zip(benchmark.slice_from(start));
    match trimmed {
        Some((r, b)) => {
            if r.len() < returns.len() {
                debug!(series = returns.name(), %start, "matched start dates");
            }
            Ok((r, b))
        }
        None => Err(StatsError::BenchmarkAlignment {
            series: returns.name().to_string(),
            reason: format!("no observations on or after {start}"),
        }),
    }
}

/// `ln(1 + r)` per period.
pub fn log_returns(returns: &ReturnSeries) -> ReturnSeries {
    let values = returns.values().iter().map(|r| (1.0 + r).ln()).collect();
    returns.derived(returns.dates().to_vec(), values)
}

/// Running compounded return `Π(1 + r_i) - 1` up to each period.
pub fn compsum(values: &[f64]) -> Vec<f64> {
    let mut growth = 1.0;
    values
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth - 1.0
        })
        .collect()
}

/// Rescale prices so the first observation equals `base`.
pub fn rebase(prices: &PriceSeries, base: f64) -> Result<PriceSeries> {
    let first = prices.prices()[0];
    let values = prices.prices().iter().map(|p| p / first * base).collect();
    PriceSeries::new(prices.name(), prices.dates().to_vec(), values)
}

fn looks_like_prices(values: &[f64]) -> bool {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return false;
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    min >= 0.0 && max > 1.0
}

fn pct_change(values: &[f64]) -> Vec<f64> {
    // The first price still marks a period, so it gets a zero return.
    let mut out = Vec::with_capacity(values.len());
    out.push(0.0);
    out.extend(values.windows(2).map(|w| {
        if w[0] != 0.0 {
            w[1] / w[0] - 1.0
        } else {
            f64::NAN
        }
    }));
    out
}

fn first_active_date(series: &ReturnSeries) -> NaiveDate {
    series
        .iter()
        .find(|(_, v)| *v != 0.0 && !v.is_nan())
        .map(|(d, _)| d)
        .unwrap_or_else(|| series.first_date())
}

pub(crate) fn intersect_dates(a: &[NaiveDate], b: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Restrict `series` to `dates`, which must be a subset of its index.
pub(crate) fn reindex(series: &ReturnSeries, dates: &[NaiveDate]) -> ReturnSeries {
    let values = dates
        .iter()
        .map(|d| series.get(*d).unwrap_or(f64::NAN))
        .collect();
    series.derived(dates.to_vec(), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::synthetic_index;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(values: &[f64]) -> ReturnSeries {
        ReturnSeries::from_values("r", values.to_vec()).unwrap()
    }

    #[test]
    fn trims_nan_head_and_tail_and_fills_interior() {
        let s = series(&[f64::NAN, 0.01, f64::NAN, 0.02, f64::NAN]);
        let p = prepare_returns(&s, &PrepareOptions::default()).unwrap();
        assert_eq!(p.values(), &[0.01, 0.0, 0.02]);
        assert_eq!(p.first_date(), s.dates()[1]);
        assert!(p.is_prepared());
    }

    #[test]
    fn infinities_become_zero() {
        let s = series(&[0.01, f64::INFINITY, -0.01]);
        let p = prepare_returns(&s, &PrepareOptions::default()).unwrap();
        assert_eq!(p.values(), &[0.01, 0.0, -0.01]);
    }

    #[test]
    fn all_nan_is_empty_after_trim() {
        let s = series(&[f64::NAN, f64::NAN]);
        let err = prepare_returns(&s, &PrepareOptions::default()).unwrap_err();
        assert!(matches!(err, StatsError::EmptySeries { .. }));
    }

    #[test]
    fn scalar_rf_is_deannualized() {
        let s = series(&[0.01, 0.02]);
        let p = prepare_returns(&s, &PrepareOptions::with_rf(0.05, Some(252))).unwrap();
        let per = 1.05_f64.powf(1.0 / 252.0) - 1.0;
        assert!((p.values()[0] - (0.01 - per)).abs() < 1e-15);
        assert!((p.values()[1] - (0.02 - per)).abs() < 1e-15);
    }

    #[test]
    fn scalar_rf_without_periods_is_subtracted_raw() {
        let s = series(&[0.01, 0.02]);
        let p = prepare_returns(&s, &PrepareOptions::with_rf(0.001, None)).unwrap();
        assert!((p.values()[0] - 0.009).abs() < 1e-15);
    }

    #[test]
    fn series_rf_is_subtracted_elementwise() {
        let s = series(&[0.01, 0.02]);
        let rf = ReturnSeries::from_values("rf", vec![0.001, 0.002]).unwrap();
        let p = prepare_returns(&s, &PrepareOptions::with_rf(RiskFree::Series(rf), None)).unwrap();
        assert!((p.values()[0] - 0.009).abs() < 1e-15);
        assert!((p.values()[1] - 0.018).abs() < 1e-15);
    }

    #[test]
    fn series_rf_missing_date_is_rejected() {
        let s = series(&[0.01, 0.02]);
        let rf = ReturnSeries::from_values("rf", vec![0.001]).unwrap();
        let err =
            prepare_returns(&s, &PrepareOptions::with_rf(RiskFree::Series(rf), None)).unwrap_err();
        assert!(matches!(err, StatsError::RiskFreeAlignment { .. }));
    }

    #[test]
    fn preparation_is_idempotent() {
        let s = series(&[0.01, -0.02, 0.03]);
        let opts = PrepareOptions::with_rf(0.04, Some(252));
        let once = prepare_returns(&s, &opts).unwrap();
        let twice = prepare_returns(&once, &opts).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn prepared_without_rate_accepts_a_later_rate() {
        let s = series(&[0.01, -0.02, 0.03]);
        let clean = prepare_returns(&s, &PrepareOptions::default()).unwrap();
        assert!(clean.risk_free().is_none());

        let opts = PrepareOptions::with_rf(0.05, Some(252));
        let later = prepare_returns(&clean, &opts).unwrap();
        let direct = prepare_returns(&s, &opts).unwrap();
        assert_eq!(later, direct);
        assert!(later.is_prepared());
        assert!(later.risk_free().unwrap().matches(&RiskFree::Annual(0.05), Some(252)));
    }

    #[test]
    fn different_rate_on_adjusted_series_is_rejected() {
        let s = series(&[0.01, -0.02, 0.03]);
        let p = prepare_returns(&s, &PrepareOptions::with_rf(0.05, Some(252))).unwrap();
        let err = prepare_returns(&p, &PrepareOptions::with_rf(0.03, Some(252))).unwrap_err();
        assert!(matches!(err, StatsError::RiskFreeConflict { .. }));
        assert!(err.is_configuration());

        let err = to_excess_returns(&p, &RiskFree::Annual(0.05), Some(12)).unwrap_err();
        assert!(matches!(err, StatsError::RiskFreeConflict { .. }));
    }

    #[test]
    fn zero_periods_is_rejected() {
        let s = series(&[0.01, 0.02]);
        let err = to_excess_returns(&s, &RiskFree::Annual(0.05), Some(0)).unwrap_err();
        assert_eq!(err, StatsError::InvalidPeriods);
        assert!(err.is_configuration());
        assert_eq!(require_periods(0.05, Some(0)), Err(StatsError::InvalidPeriods));
    }

    #[test]
    fn price_like_input_is_converted() {
        let s = series(&[100.0, 110.0, 99.0]);
        let p = prepare_returns(&s, &PrepareOptions::default()).unwrap();
        assert_eq!(p.values()[0], 0.0);
        assert!((p.values()[1] - 0.1).abs() < 1e-12);
        assert!((p.values()[2] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn require_periods_flags_configuration() {
        assert!(require_periods(0.0, None).is_ok());
        assert!(require_periods(0.02, Some(252)).is_ok());
        let err = require_periods(0.02, None).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn align_inner_joins() {
        let a = ReturnSeries::from_pairs(
            "a",
            vec![(d(2024, 1, 1), 0.1), (d(2024, 1, 2), 0.2), (d(2024, 1, 3), 0.3)],
        )
        .unwrap();
        let b = ReturnSeries::from_pairs(
            "b",
            vec![(d(2024, 1, 2), 1.0), (d(2024, 1, 3), 2.0), (d(2024, 1, 4), 3.0)],
        )
        .unwrap();
        let (ra, rb) = align(&a, &b).unwrap();
        assert_eq!(ra.dates(), rb.dates());
        assert_eq!(ra.values(), &[0.2, 0.3]);
        assert_eq!(rb.values(), &[1.0, 2.0]);
    }

    #[test]
    fn align_disjoint_is_validation_error() {
        let a = ReturnSeries::from_pairs("a", vec![(d(2024, 1, 1), 0.1)]).unwrap();
        let b = ReturnSeries::from_pairs("b", vec![(d(2024, 2, 1), 0.1)]).unwrap();
        let err = align(&a, &b).unwrap_err();
        assert!(matches!(err, StatsError::BenchmarkAlignment { .. }));
    }

    #[test]
    fn match_dates_starts_at_later_first_activity() {
        let idx = synthetic_index(4);
        let a = ReturnSeries::new("a", idx.clone(), vec![0.0, 0.01, 0.02, 0.03]).unwrap();
        let b = ReturnSeries::new("b", idx.clone(), vec![0.0, 0.0, 0.01, 0.02]).unwrap();
        let (ma, mb) = match_dates(&a, &b).unwrap();
        assert_eq!(ma.first_date(), idx[2]);
        assert_eq!(ma.dates(), mb.dates());
    }

    #[test]
    fn compsum_compounds() {
        let c = compsum(&[0.1, 0.1]);
        assert!((c[0] - 0.1).abs() < 1e-12);
        assert!((c[1] - 0.21).abs() < 1e-12);
    }

    #[test]
    fn rebase_starts_at_base() {
        let p = PriceSeries::new("p", synthetic_index(2), vec![50.0, 55.0]).unwrap();
        let r = rebase(&p, 100.0).unwrap();
        assert_eq!(r.prices(), &[100.0, 110.0]);
    }

    #[test]
    fn log_returns_of_zero_are_zero() {
        let l = log_returns(&series(&[0.0, 0.0]));
        assert_eq!(l.values(), &[0.0, 0.0]);
    }
}
