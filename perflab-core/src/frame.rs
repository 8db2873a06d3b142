//! Single- and multi-strategy inputs behind one tagged variant.
//!
//! Every metric is written once against a `&ReturnSeries`. `Returns` lifts it
//! to either a scalar (single strategy) or one value per named column
//! (multi strategy) through [`Returns::evaluate`], so no metric branches on
//! the shape of its input.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};
use crate::prepare::{intersect_dates, prepare_returns, reindex, PrepareOptions};
use crate::series::ReturnSeries;

/// Named return columns sharing one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnFrame {
    columns: Vec<ReturnSeries>,
}

impl ReturnFrame {
    /// Columns must share an identical index and have unique names.
    pub fn from_columns(columns: Vec<ReturnSeries>) -> Result<Self> {
        let first = columns.first().ok_or_else(|| StatsError::EmptySeries {
            series: "frame".into(),
        })?;
        let mut seen = HashSet::new();
        for col in &columns {
            if col.dates() != first.dates() {
                return Err(StatsError::IndexMismatch {
                    series: col.name().to_string(),
                });
            }
            if !seen.insert(col.name()) {
                return Err(StatsError::DuplicateColumn {
                    series: col.name().to_string(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Restrict heterogeneous columns to their common dates.
    pub fn inner_join(columns: Vec<ReturnSeries>) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Err(StatsError::EmptySeries {
                series: "frame".into(),
            });
        };
        let common = columns
            .iter()
            .skip(1)
            .fold(first.dates().to_vec(), |acc, col| {
                intersect_dates(&acc, col.dates())
            });
        if common.is_empty() {
            return Err(StatsError::IndexMismatch {
                series: first.name().to_string(),
            });
        }
        let joined = columns.iter().map(|c| reindex(c, &common)).collect();
        Self::from_columns(joined)
    }

    pub fn columns(&self) -> &[ReturnSeries] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ReturnSeries> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn index(&self) -> &[NaiveDate] {
        self.columns[0].dates()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Either one strategy or several strategies sharing an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Returns {
    Single(ReturnSeries),
    Multi(ReturnFrame),
}

impl From<ReturnSeries> for Returns {
    fn from(series: ReturnSeries) -> Self {
        Returns::Single(series)
    }
}

impl From<ReturnFrame> for Returns {
    fn from(frame: ReturnFrame) -> Self {
        Returns::Multi(frame)
    }
}

impl Returns {
    /// Uniform column view: one column for `Single`.
    pub fn columns(&self) -> &[ReturnSeries] {
        match self {
            Returns::Single(s) => std::slice::from_ref(s),
            Returns::Multi(f) => f.columns(),
        }
    }

    pub fn index(&self) -> &[NaiveDate] {
        self.columns()[0].dates()
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Returns::Multi(_))
    }

    /// Apply `metric` per column.
    pub fn evaluate<T>(&self, metric: impl Fn(&ReturnSeries) -> T) -> PerColumn<T> {
        match self {
            Returns::Single(s) => PerColumn::Scalar(metric(s)),
            Returns::Multi(f) => PerColumn::Columns(
                f.columns()
                    .iter()
                    .map(|c| (c.name().to_string(), metric(c)))
                    .collect(),
            ),
        }
    }

    /// Fallible [`Returns::evaluate`]; the first error wins.
    pub fn try_evaluate<T>(
        &self,
        metric: impl Fn(&ReturnSeries) -> Result<T>,
    ) -> Result<PerColumn<T>> {
        match self {
            Returns::Single(s) => Ok(PerColumn::Scalar(metric(s)?)),
            Returns::Multi(f) => f
                .columns()
                .iter()
                .map(|c| Ok((c.name().to_string(), metric(c)?)))
                .collect::<Result<Vec<_>>>()
                .map(PerColumn::Columns),
        }
    }

    /// Prepare every column. Columns that trim to different lengths are
    /// re-joined on their common dates.
    pub fn prepare(&self, opts: &PrepareOptions) -> Result<Returns> {
        match self {
            Returns::Single(s) => Ok(Returns::Single(prepare_returns(s, opts)?)),
            Returns::Multi(f) => {
                let cols = f
                    .columns()
                    .iter()
                    .map(|c| prepare_returns(c, opts))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Returns::Multi(ReturnFrame::inner_join(cols)?))
            }
        }
    }
}

/// Metric output: a scalar for a single strategy, one value per column for
/// many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PerColumn<T> {
    Scalar(T),
    Columns(Vec<(String, T)>),
}

impl<T> PerColumn<T> {
    pub fn scalar(&self) -> Option<&T> {
        match self {
            PerColumn::Scalar(v) => Some(v),
            PerColumn::Columns(_) => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        match self {
            PerColumn::Scalar(_) => None,
            PerColumn::Columns(cols) => cols.iter().find(|(n, _)| n == name).map(|(_, v)| v),
        }
    }

    /// Values in column order.
    pub fn values(&self) -> Vec<&T> {
        match self {
            PerColumn::Scalar(v) => vec![v],
            PerColumn::Columns(cols) => cols.iter().map(|(_, v)| v).collect(),
        }
    }

    pub fn map<U>(self, f: impl Fn(T) -> U) -> PerColumn<U> {
        match self {
            PerColumn::Scalar(v) => PerColumn::Scalar(f(v)),
            PerColumn::Columns(cols) => {
                PerColumn::Columns(cols.into_iter().map(|(n, v)| (n, f(v))).collect())
            }
        }
    }
}
