//! Calendar aggregation of return series.
//!
//! Groups observations by calendar period and reduces each group either by
//! compounding (`Π(1+r) - 1`) or by summation. The aggregated observation is
//! labelled with the last date seen in its group, which keeps the index
//! strictly increasing.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::series::ReturnSeries;

/// Target period for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    /// Group key of a date. Weeks use ISO week numbering.
    pub fn key(self, date: NaiveDate) -> (i32, u32) {
        match self {
            Period::Week => {
                let w = date.iso_week();
                (w.year(), w.week())
            }
            Period::Month => (date.year(), date.month()),
            Period::Quarter => (date.year(), (date.month() - 1) / 3 + 1),
            Period::Year => (date.year(), 0),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
        };
        f.write_str(s)
    }
}

impl FromStr for Period {
    type Err = StatsError;

    /// Accepts names (`month`) and resample-style codes (`W`, `ME`, `QE`, `YE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "week" | "weekly" => Ok(Period::Week),
            "m" | "me" | "month" | "monthly" => Ok(Period::Month),
            "q" | "qe" | "quarter" | "quarterly" => Ok(Period::Quarter),
            "y" | "a" | "ye" | "year" | "yearly" | "eoy" => Ok(Period::Year),
            other => Err(StatsError::InvalidParameter {
                name: "period",
                reason: format!("unknown period code '{other}'"),
            }),
        }
    }
}

/// Reduce a group of returns.
pub fn reduce(values: &[f64], compounded: bool) -> f64 {
    if compounded {
        values.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
    } else {
        values.iter().sum()
    }
}

/// Consecutive groups of observations sharing a period key.
pub fn group_by_period(series: &ReturnSeries, period: Period) -> Vec<(NaiveDate, Vec<f64>)> {
    let mut groups: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    let mut current_key = None;
    for (date, value) in series.iter() {
        let key = period.key(date);
        if current_key == Some(key) {
            if let Some((label, values)) = groups.last_mut() {
                *label = date;
                values.push(value);
                continue;
            }
        }
        groups.push((date, vec![value]));
        current_key = Some(key);
    }
    groups
}

/// Aggregate `series` into `period`. `None` returns the series unchanged.
pub fn aggregate_returns(
    series: &ReturnSeries,
    period: Option<Period>,
    compounded: bool,
) -> ReturnSeries {
    let Some(period) = period else {
        return series.clone();
    };
    let (dates, values) = group_by_period(series, period)
        .into_iter()
        .map(|(label, values)| (label, reduce(&values, compounded)))
        .unzip();
    series.derived(dates, values)
}

/// One calendar year of the month-by-month returns table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub year: i32,
    /// January through December; `None` where no observation exists.
    pub months: [Option<f64>; 12],
    /// Whole-year return over the observed months.
    pub eoy: f64,
}

/// Year × month return matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturns {
    pub rows: Vec<MonthlyRow>,
}

/// Build the year × month table with an end-of-year column.
pub fn monthly_returns(series: &ReturnSeries, compounded: bool) -> MonthlyReturns {
    let monthly = aggregate_returns(series, Some(Period::Month), compounded);
    let mut rows: Vec<MonthlyRow> = Vec::new();
    for (date, value) in monthly.iter() {
        if rows.last().map(|r| r.year) != Some(date.year()) {
            rows.push(MonthlyRow {
                year: date.year(),
                months: [None; 12],
                eoy: 0.0,
            });
        }
        if let Some(row) = rows.last_mut() {
            row.months[date.month0() as usize] = Some(value);
        }
    }
    for row in rows.iter_mut() {
        let observed: Vec<f64> = row.months.iter().flatten().copied().collect();
        row.eoy = reduce(&observed, compounded);
    }
    MonthlyReturns { rows }
}
