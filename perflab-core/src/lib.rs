//! PerfLab Core: statistics engine for portfolio performance and risk.
//!
//! This crate contains everything that computes numbers:
//! - Return and price series with validated, strictly increasing indexes
//! - Return preparation (price detection, NaN handling, risk-free subtraction)
//! - Calendar aggregation (week / month / quarter / year)
//! - Drawdown engine (underwater curve, episodes, summary)
//! - Metrics library (~60 pure functions of prepared returns)
//! - `Returns`, the single-or-multi strategy input variant

pub mod aggregate;
pub mod drawdown;
pub mod error;
pub mod frame;
pub mod prepare;
pub mod series;
pub mod stats;

pub use aggregate::{aggregate_returns, monthly_returns, MonthlyReturns, MonthlyRow, Period};
pub use drawdown::{
    drawdown_details, max_drawdown, to_drawdown_series, top_drawdowns, DrawdownEpisode,
    DrawdownSeries, DrawdownStats,
};
pub use error::{Result, StatsError};
pub use frame::{PerColumn, ReturnFrame, Returns};
pub use prepare::{
    align, match_dates, prepare_returns, to_excess_returns, AppliedRiskFree, PrepareOptions,
    RiskFree,
};
pub use series::{PriceSeries, ReturnSeries};
