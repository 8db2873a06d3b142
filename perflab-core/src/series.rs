//! Return and price series: the canonical inputs of the engine.
//!
//! A `ReturnSeries` is an ordered sequence of (date, fractional return) pairs
//! with a strictly increasing index. Construction validates the index and the
//! lengths; it never inspects or rewrites the values. Cleaning (NaN trimming,
//! risk-free subtraction) is the job of [`crate::prepare`].

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};
use crate::prepare::AppliedRiskFree;

/// First date of the index assigned by [`ReturnSeries::from_values`].
pub const SYNTHETIC_EPOCH: (i32, u32, u32) = (2000, 1, 3);

/// Fractional period returns indexed by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesData")]
pub struct ReturnSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    prepared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_free: Option<Box<AppliedRiskFree>>,
}

/// Unvalidated wire shape of a series.
#[derive(Debug, Clone, Deserialize)]
struct SeriesData {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    #[serde(default)]
    prepared: bool,
    #[serde(default)]
    risk_free: Option<Box<AppliedRiskFree>>,
}

impl TryFrom<SeriesData> for ReturnSeries {
    type Error = StatsError;

    fn try_from(data: SeriesData) -> Result<Self> {
        let mut series = ReturnSeries::new(data.name, data.dates, data.values)?;
        series.prepared = data.prepared;
        series.risk_free = data.risk_free;
        Ok(series)
    }
}

impl ReturnSeries {
    /// Build a series, rejecting empty input, length mismatches and an index
    /// that is not strictly increasing.
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(StatsError::EmptySeries { series: name });
        }
        if dates.len() != values.len() {
            return Err(StatsError::LengthMismatch {
                what: "dates/values",
                left: dates.len(),
                right: values.len(),
            });
        }
        validate_index(&name, &dates)?;
        Ok(Self {
            name,
            dates,
            values,
            prepared: false,
            risk_free: None,
        })
    }

    /// Build a series from (date, value) pairs.
    pub fn from_pairs(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self> {
        let (dates, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self::new(name, dates, values)
    }

    /// Build a series over a synthetic consecutive-day index starting at
    /// [`SYNTHETIC_EPOCH`]. Useful for literal fixtures without dates.
    pub fn from_values(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let dates = synthetic_index(values.len());
        Self::new(name, dates, values)
    }

    /// Parse textual values. Empty cells and `nan` become NaN; anything else
    /// that is not a number is a validation error.
    pub fn parse<S: AsRef<str>>(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        raw: &[S],
    ) -> Result<Self> {
        let name = name.into();
        let values = parse_values(&name, raw)?;
        Self::new(name, dates, values)
    }

    /// [`ReturnSeries::parse`] over a synthetic index.
    pub fn parse_values<S: AsRef<str>>(name: impl Into<String>, raw: &[S]) -> Result<Self> {
        let name = name.into();
        let values = parse_values(&name, raw)?;
        Self::from_values(name, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Whether this series already went through return preparation.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// The risk-free rate already subtracted, if any.
    pub fn risk_free(&self) -> Option<&AppliedRiskFree> {
        self.risk_free.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at an exact date, if present.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|idx| self.values[idx])
    }

    /// Same index, new values. Keeps the name; the result is unprepared.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.values.len() {
            return Err(StatsError::LengthMismatch {
                what: "index/values",
                left: self.values.len(),
                right: values.len(),
            });
        }
        Ok(Self {
            name: self.name.clone(),
            dates: self.dates.clone(),
            values,
            prepared: false,
            risk_free: None,
        })
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Observations whose date satisfies `keep`. `None` when nothing survives.
    pub fn filter_dates(&self, keep: impl Fn(NaiveDate) -> bool) -> Option<Self> {
        self.filter(|d, _| keep(d))
    }

    /// Observations satisfying `keep(date, value)`. `None` when nothing survives.
    pub fn filter(&self, keep: impl Fn(NaiveDate, f64) -> bool) -> Option<Self> {
        let (dates, values): (Vec<_>, Vec<_>) = self.iter().filter(|(d, v)| keep(*d, *v)).unzip();
        if values.is_empty() {
            return None;
        }
        Some(Self {
            name: self.name.clone(),
            dates,
            values,
            prepared: self.prepared,
            risk_free: self.risk_free.clone(),
        })
    }

    /// Observations on or after `start`.
    pub fn slice_from(&self, start: NaiveDate) -> Option<Self> {
        let idx = self.dates.partition_point(|d| *d < start);
        self.slice_range(idx, self.len())
    }

    /// Positional slice `[from, to)`; `None` when empty.
    pub fn slice_range(&self, from: usize, to: usize) -> Option<Self> {
        let to = to.min(self.len());
        if from >= to {
            return None;
        }
        Some(Self {
            name: self.name.clone(),
            dates: self.dates[from..to].to_vec(),
            values: self.values[from..to].to_vec(),
            prepared: self.prepared,
            risk_free: self.risk_free.clone(),
        })
    }

    /// Compound into prices: `price[t] = base * Π(1 + r_i)` for `i <= t`.
    pub fn to_prices(&self, base: f64) -> Result<PriceSeries> {
        let mut level = base;
        let prices = self
            .values
            .iter()
            .map(|r| {
                level *= 1.0 + r;
                level
            })
            .collect();
        PriceSeries::new(self.name.clone(), self.dates.clone(), prices)
    }

    pub(crate) fn into_prepared(mut self) -> Self {
        self.prepared = true;
        self
    }

    pub(crate) fn with_risk_free(mut self, applied: AppliedRiskFree) -> Self {
        self.risk_free = Some(Box::new(applied));
        self
    }

    /// New values on a new index, keeping name and preparation state.
    pub(crate) fn derived(&self, dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self {
            name: self.name.clone(),
            dates,
            values,
            prepared: self.prepared,
            risk_free: self.risk_free.clone(),
        }
    }

    pub(crate) fn from_parts_unchecked(
        name: String,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
        prepared: bool,
    ) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self {
            name,
            dates,
            values,
            prepared,
            risk_free: None,
        }
    }
}

/// Strictly positive prices indexed by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    name: String,
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, prices: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if prices.is_empty() {
            return Err(StatsError::EmptySeries { series: name });
        }
        if dates.len() != prices.len() {
            return Err(StatsError::LengthMismatch {
                what: "dates/prices",
                left: dates.len(),
                right: prices.len(),
            });
        }
        validate_index(&name, &dates)?;
        if let Some(pos) = prices.iter().position(|p| !p.is_finite() || *p <= 0.0) {
            return Err(StatsError::NonFinitePrice {
                series: name,
                date: dates[pos],
            });
        }
        Ok(Self {
            name,
            dates,
            prices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Percentage change. The first period has no predecessor and is 0.
    pub fn to_returns(&self) -> ReturnSeries {
        let mut values = Vec::with_capacity(self.prices.len());
        values.push(0.0);
        values.extend(self.prices.windows(2).map(|w| w[1] / w[0] - 1.0));
        ReturnSeries::from_parts_unchecked(self.name.clone(), self.dates.clone(), values, false)
    }

    /// Percentage change with the first period measured against `base`,
    /// the exact inverse of [`ReturnSeries::to_prices`].
    pub fn to_returns_from(&self, base: f64) -> ReturnSeries {
        let mut prev = base;
        let values = self
            .prices
            .iter()
            .map(|p| {
                let r = if prev != 0.0 { p / prev - 1.0 } else { 0.0 };
                prev = *p;
                r
            })
            .collect();
        ReturnSeries::from_parts_unchecked(self.name.clone(), self.dates.clone(), values, false)
    }
}

fn validate_index(name: &str, dates: &[NaiveDate]) -> Result<()> {
    if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
        return Err(StatsError::UnsortedIndex {
            series: name.to_string(),
            date: w[1],
        });
    }
    Ok(())
}

fn parse_values<S: AsRef<str>>(name: &str, raw: &[S]) -> Result<Vec<f64>> {
    raw.iter()
        .enumerate()
        .map(|(position, cell)| {
            let text = cell.as_ref().trim();
            if text.is_empty() {
                return Ok(f64::NAN);
            }
            text.parse::<f64>().map_err(|_| StatsError::NonNumeric {
                series: name.to_string(),
                position,
                raw: text.to_string(),
            })
        })
        .collect()
}

/// Consecutive calendar days starting at [`SYNTHETIC_EPOCH`].
pub fn synthetic_index(len: usize) -> Vec<NaiveDate> {
    let (y, m, d) = SYNTHETIC_EPOCH;
    let start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    (0..len as u64)
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .collect()
}
