//! Drawdown engine: underwater curve and discrete drawdown episodes.
//!
//! The equity curve is the compounded return series starting from a unit of
//! capital; the running peak includes that starting unit, so a loss on the
//! very first period is already a drawdown. Equity never goes below zero:
//! a loss of 100% or more wipes the account out and every later value is -1.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};
use crate::series::ReturnSeries;

/// Percentage decline from the running equity peak, one value per period.
///
/// Values lie in `[-1, 0]` and are exactly `0` at every new equity high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DrawdownSeries {
    /// Wrap an externally computed drawdown curve.
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        // Reuse the index validation of ReturnSeries.
        let checked = ReturnSeries::new(name, dates, values)?;
        if let Some((date, v)) = checked.iter().find(|(_, v)| !(-1.0..=0.0).contains(v)) {
            return Err(StatsError::InvalidParameter {
                name: "drawdown",
                reason: format!("drawdown {v} at {date} is outside [-1, 0]"),
            });
        }
        Ok(Self {
            name: checked.name().to_string(),
            dates: checked.dates().to_vec(),
            values: checked.values().to_vec(),
        })
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

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deepest point of the curve (most negative value), 0 when never underwater.
    pub fn max_drawdown(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::min)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}

/// One underwater stretch of the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownEpisode {
    /// First underwater date.
    pub start: NaiveDate,
    /// Date of the deepest point.
    pub valley: NaiveDate,
    /// Recovery date, or the last date of the series when unrecovered.
    pub end: NaiveDate,
    /// Calendar days between `start` and `end`.
    pub days: i64,
    /// Deepest drawdown of the episode (negative fraction).
    pub max_drawdown: f64,
    /// Whether equity got back to its previous peak.
    pub recovered: bool,
}

/// Compound the returns, track the running peak, emit `equity / peak - 1`.
pub fn to_drawdown_series(returns: &ReturnSeries) -> DrawdownSeries {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let values = returns
        .values()
        .iter()
        .map(|&r| {
            // Unprepared input may still hold gaps.
            equity = (equity * (1.0 + if r.is_finite() { r } else { 0.0 })).max(0.0);
            if equity > peak {
                peak = equity;
            }
            equity / peak - 1.0
        })
        .collect();
    DrawdownSeries {
        name: returns.name().to_string(),
        dates: returns.dates().to_vec(),
        values,
    }
}

/// Maximum drawdown of a return series as a negative fraction (0 if none).
pub fn max_drawdown(returns: &ReturnSeries) -> f64 {
    to_drawdown_series(returns).max_drawdown()
}

/// Extract drawdown episodes in chronological order of their start.
///
/// A transition from 0 to negative opens an episode on the underwater date;
/// a return to 0 closes it on the recovery date. A series that starts
/// underwater opens on its first date, one that ends underwater closes on its
/// last date. No underwater values yield an empty vector.
pub fn drawdown_details(drawdown: &DrawdownSeries) -> Vec<DrawdownEpisode> {
    let dates = drawdown.dates();
    let values = drawdown.values();
    let mut episodes = Vec::new();
    let mut open: Option<usize> = None;

    for (i, &v) in values.iter().enumerate() {
        match open {
            None if v < 0.0 => open = Some(i),
            Some(start) if v >= 0.0 => {
                episodes.push(episode(dates, values, start, i, true));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        episodes.push(episode(dates, values, start, values.len() - 1, false));
    }
    episodes
}

fn episode(
    dates: &[NaiveDate],
    values: &[f64],
    start: usize,
    end: usize,
    recovered: bool,
) -> DrawdownEpisode {
    let (valley_idx, depth) = values[start..=end]
        .iter()
        .enumerate()
        .fold((start, 0.0_f64), |(idx, min), (offset, &v)| {
            if v < min {
                (start + offset, v)
            } else {
                (idx, min)
            }
        });
    DrawdownEpisode {
        start: dates[start],
        valley: dates[valley_idx],
        end: dates[end],
        days: (dates[end] - dates[start]).num_days(),
        max_drawdown: depth,
        recovered,
    }
}

/// The `n` deepest episodes, deepest first. Ties keep chronological order.
pub fn top_drawdowns(episodes: &[DrawdownEpisode], n: usize) -> Vec<DrawdownEpisode> {
    let mut sorted = episodes.to_vec();
    sorted.sort_by(|a, b| {
        a.max_drawdown
            .partial_cmp(&b.max_drawdown)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(n);
    sorted
}

/// Summary of all drawdown episodes of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStats {
    /// Deepest episode (negative fraction).
    pub max_drawdown: f64,
    /// Longest episode in calendar days.
    pub longest_days: i64,
    /// Mean episode depth (negative fraction).
    pub avg_drawdown: f64,
    /// Mean episode length in calendar days.
    pub avg_days: f64,
    pub episodes: usize,
}

impl DrawdownStats {
    /// `None` when there is no drawdown at all.
    pub fn from_episodes(episodes: &[DrawdownEpisode]) -> Option<Self> {
        if episodes.is_empty() {
            return None;
        }
        let n = episodes.len() as f64;
        Some(Self {
            max_drawdown: episodes.iter().map(|e| e.max_drawdown).fold(0.0, f64::min),
            longest_days: episodes.iter().map(|e| e.days).max().unwrap_or(0),
            avg_drawdown: episodes.iter().map(|e| e.max_drawdown).sum::<f64>() / n,
            avg_days: episodes.iter().map(|e| e.days as f64).sum::<f64>() / n,
            episodes: episodes.len(),
        })
    }

    pub fn from_returns(returns: &ReturnSeries) -> Option<Self> {
        Self::from_episodes(&drawdown_details(&to_drawdown_series(returns)))
    }
}
