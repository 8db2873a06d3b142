//! Metrics table builder.
//!
//! Inputs are prepared exactly once; every row reuses the prepared columns.
//! A benchmark is inner-joined with the strategies (and optionally trimmed to
//! a common start) before any metric runs, so all columns share one index.
//!
//! Row layout, top to bottom:
//! - summary: period covered, risk-free rate, time in market
//! - returns: total return and CAGR
//! - ratios: Sharpe family, Sortino family, Omega
//! - drawdown: depth, duration, recovery, Ulcer and Serenity
//! - (full) distribution, expected returns and tail risk, trade-style ratios
//! - trailing period returns (MTD through all-time)
//! - (full) best and worst periods, win rates
//! - (full, with benchmark) greeks

use std::f64::consts::SQRT_2;

use chrono::{Datelike, Months, NaiveDate};
use tracing::{debug, warn};

use perflab_core::aggregate::{aggregate_returns, Period};
use perflab_core::drawdown::DrawdownStats;
use perflab_core::frame::Returns;
use perflab_core::prepare::{align, match_dates, prepare_returns, to_excess_returns, RiskFree};
use perflab_core::series::ReturnSeries;
use perflab_core::stats;
use perflab_core::StatsError;

use crate::config::MetricsConfig;
use crate::error::ReportError;
use crate::table::{Cell, MetricTable, RowKind};

/// One prepared column of the table.
struct Column {
    title: String,
    returns: ReturnSeries,
    /// `returns` net of the de-annualized risk-free rate.
    excess: ReturnSeries,
    drawdown: Option<DrawdownStats>,
    is_benchmark: bool,
}

impl Column {
    fn new(
        title: String,
        returns: ReturnSeries,
        config: &MetricsConfig,
        is_benchmark: bool,
    ) -> Result<Self, ReportError> {
        let excess = to_excess_returns(
            &returns,
            &RiskFree::Annual(config.rf),
            Some(config.periods_per_year),
        )?;
        Ok(Self {
            title,
            drawdown: DrawdownStats::from_returns(&returns),
            returns,
            excess,
            is_benchmark,
        })
    }
}

/// Build the metrics table for one or more strategies and an optional
/// benchmark.
///
/// The benchmark, when given, is the first column. Values that cannot be
/// computed are stored as [`Cell::Unavailable`].
pub fn metrics(
    returns: &Returns,
    benchmark: Option<&ReturnSeries>,
    config: &MetricsConfig,
) -> Result<MetricTable, ReportError> {
    config.validate()?;
    let opts = config.prepare_options();

    let prepared = returns.prepare(&opts)?;
    let titles: Vec<String> = match &prepared {
        Returns::Single(_) => vec![config.strategy_title.clone()],
        Returns::Multi(frame) => frame.names().into_iter().map(String::from).collect(),
    };
    let strategies = prepared.columns().to_vec();

    let (strategies, benchmark) = match benchmark {
        Some(b) => {
            let b = prepare_returns(b, &opts)?;
            let (s, b) = join_benchmark(strategies, b, config.match_dates)?;
            (s, Some(b))
        }
        None => (strategies, None),
    };

    let mut columns = Vec::with_capacity(strategies.len() + 1);
    if let Some(b) = &benchmark {
        columns.push(Column::new(config.benchmark_title.clone(), b.clone(), config, true)?);
    }
    for (title, series) in titles.into_iter().zip(strategies) {
        columns.push(Column::new(title, series, config, false)?);
    }

    debug!(
        columns = columns.len(),
        benchmark = benchmark.is_some(),
        mode = ?config.mode,
        "building metrics table"
    );

    let mut rows = Rows {
        table: MetricTable::new(columns.iter().map(|c| c.title.clone()).collect()),
        columns: &columns,
        benchmark: benchmark.as_ref(),
        config,
    };
    rows.summary()?;
    rows.returns()?;
    rows.ratios()?;
    rows.drawdowns()?;
    if config.mode.is_full() {
        rows.distribution()?;
        rows.expected_and_tail()?;
        rows.trade_ratios()?;
    }
    rows.period_returns()?;
    if config.mode.is_full() {
        rows.best_worst()?;
        rows.win_rates()?;
        rows.greeks()?;
    }

    let table = rows.table;
    debug!(rows = table.metric_count(), "metrics table built");
    Ok(if config.sep {
        table
    } else {
        table.without_separators()
    })
}

// ─── Benchmark alignment ────────────────────────────────────────────

/// Restrict every strategy and the benchmark to their common dates, then
/// optionally to the latest first active date among them.
fn join_benchmark(
    strategies: Vec<ReturnSeries>,
    benchmark: ReturnSeries,
    match_start: bool,
) -> Result<(Vec<ReturnSeries>, ReturnSeries), ReportError> {
    let mut bench = benchmark;
    for s in &strategies {
        bench = align(s, &bench).map_err(invalid_benchmark)?.1;
    }
    let mut strategies = strategies
        .iter()
        .map(|s| align(s, &bench).map(|(s, _)| s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid_benchmark)?;

    if match_start {
        let mut start = bench.first_date();
        for s in &strategies {
            let (_, b) = match_dates(s, &bench).map_err(invalid_benchmark)?;
            start = start.max(b.first_date());
        }
        bench = trimmed(&bench, start)?;
        strategies = strategies
            .iter()
            .map(|s| trimmed(s, start))
            .collect::<Result<_, _>>()?;
    }
    Ok((strategies, bench))
}

fn trimmed(series: &ReturnSeries, start: NaiveDate) -> Result<ReturnSeries, ReportError> {
    series
        .slice_from(start)
        .ok_or_else(|| ReportError::InvalidBenchmark {
            reason: format!("'{}' has no observations on or after {start}", series.name()),
        })
}

fn invalid_benchmark(err: StatsError) -> ReportError {
    match err {
        StatsError::BenchmarkAlignment { reason, .. } => ReportError::InvalidBenchmark { reason },
        other => other.into(),
    }
}

// ─── Row assembly ───────────────────────────────────────────────────

struct Rows<'a> {
    table: MetricTable,
    columns: &'a [Column],
    benchmark: Option<&'a ReturnSeries>,
    config: &'a MetricsConfig,
}

impl Rows<'_> {
    fn periods(&self) -> u32 {
        self.config.periods_per_year
    }

    fn cells(
        &mut self,
        label: &str,
        kind: RowKind,
        f: impl Fn(&Column) -> perflab_core::Result<Cell>,
    ) -> Result<(), ReportError> {
        let cells = self
            .columns
            .iter()
            .map(|c| {
                let cell = f(c)?;
                if cell.is_unavailable() {
                    debug!(metric = label, column = %c.title, "metric unavailable");
                }
                Ok(cell)
            })
            .collect::<perflab_core::Result<Vec<_>>>()?;
        self.table.push_metric(label, kind, cells);
        Ok(())
    }

    fn metric(
        &mut self,
        label: &str,
        kind: RowKind,
        f: impl Fn(&Column) -> perflab_core::Result<f64>,
    ) -> Result<(), ReportError> {
        self.cells(label, kind, |c| {
            let v = f(c)?;
            if !v.is_finite() {
                warn!(metric = label, column = %c.title, value = v, "non-finite metric");
            }
            Ok(Cell::number(v))
        })
    }

    /// Benchmark-relative row; the benchmark's own cell is unavailable.
    /// Skipped entirely without a benchmark.
    fn relative(
        &mut self,
        label: &str,
        kind: RowKind,
        f: impl Fn(&ReturnSeries, &ReturnSeries) -> perflab_core::Result<f64>,
    ) -> Result<(), ReportError> {
        let Some(bench) = self.benchmark else {
            return Ok(());
        };
        self.cells(label, kind, |c| {
            if c.is_benchmark {
                Ok(Cell::Unavailable)
            } else {
                f(&c.returns, bench).map(Cell::number)
            }
        })
    }

    fn separator(&mut self) {
        self.table.push_separator();
    }

    fn summary(&mut self) -> Result<(), ReportError> {
        let rf = self.config.rf;
        self.cells("Start Period", RowKind::Date, |c| Ok(Cell::Date(c.returns.first_date())))?;
        self.cells("End Period", RowKind::Date, |c| Ok(Cell::Date(c.returns.last_date())))?;
        self.metric("Risk-Free Rate", RowKind::Percent, |_| Ok(rf))?;
        self.metric("Time in Market", RowKind::Percent, |c| stats::exposure(&c.returns))?;
        Ok(())
    }

    fn returns(&mut self) -> Result<(), ReportError> {
        self.separator();
        let (compounded, p) = (self.config.compounded, self.periods());
        self.metric("Total Return", RowKind::Percent, |c| total(&c.returns, compounded))?;
        self.metric("CAGR", RowKind::Percent, |c| stats::cagr(&c.excess, 0.0, compounded, p))?;
        Ok(())
    }

    fn ratios(&mut self) -> Result<(), ReportError> {
        self.separator();
        let p = self.periods();
        let full = self.config.mode.is_full();
        self.metric("Sharpe", RowKind::Ratio, |c| stats::sharpe(&c.excess, 0.0, Some(p), true))?;
        self.metric("RoMaD", RowKind::Ratio, |c| stats::romad(&c.returns, p))?;
        self.relative("Corr to Benchmark", RowKind::Ratio, stats::benchmark_correlation)?;
        self.metric("Prob. Sharpe Ratio", RowKind::Percent, |c| {
            stats::probabilistic_sharpe_ratio(&c.excess, 0.0)
        })?;
        if full {
            self.metric("Smart Sharpe", RowKind::Ratio, |c| {
                stats::smart_sharpe(&c.excess, 0.0, Some(p), true)
            })?;
        }
        self.metric("Sortino", RowKind::Ratio, |c| stats::sortino(&c.excess, 0.0, Some(p), true))?;
        if full {
            self.metric("Smart Sortino", RowKind::Ratio, |c| {
                stats::smart_sortino(&c.excess, 0.0, Some(p), true)
            })?;
        }
        self.metric("Sortino/√2", RowKind::Ratio, |c| {
            stats::adjusted_sortino(&c.excess, 0.0, Some(p), true)
        })?;
        if full {
            self.metric("Smart Sortino/√2", RowKind::Ratio, |c| {
                Ok(stats::smart_sortino(&c.excess, 0.0, Some(p), true)? / SQRT_2)
            })?;
        }
        self.metric("Omega", RowKind::Ratio, |c| stats::omega(&c.excess, 0.0, 0.0, p))?;
        Ok(())
    }

    fn drawdowns(&mut self) -> Result<(), ReportError> {
        self.separator();
        self.metric("Max Drawdown", RowKind::Percent, |c| {
            Ok(c.drawdown.as_ref().map_or(0.0, |d| d.max_drawdown))
        })?;
        self.metric("Longest DD Days", RowKind::Days, |c| {
            Ok(c.drawdown.as_ref().map_or(0.0, |d| d.longest_days as f64))
        })?;
        self.metric("Avg. Drawdown", RowKind::Percent, |c| {
            Ok(c.drawdown.as_ref().map_or(0.0, |d| d.avg_drawdown))
        })?;
        self.metric("Avg. Drawdown Days", RowKind::Days, |c| {
            Ok(c.drawdown.as_ref().map_or(0.0, |d| d.avg_days))
        })?;
        self.metric("Recovery Factor", RowKind::Ratio, |c| {
            stats::recovery_factor(&c.returns, 0.0)
        })?;
        self.metric("Ulcer Index", RowKind::Ratio, |c| stats::ulcer_index(&c.returns))?;
        self.metric("Serenity Index", RowKind::Ratio, |c| {
            stats::serenity_index(&c.excess, 0.0)
        })?;
        Ok(())
    }

    fn distribution(&mut self) -> Result<(), ReportError> {
        self.separator();
        let p = self.periods();
        self.metric("Volatility (ann.)", RowKind::Percent, |c| {
            stats::volatility(&c.returns, Some(p), true)
        })?;
        self.relative("R^2", RowKind::Ratio, stats::r_squared)?;
        self.relative("Information Ratio", RowKind::Ratio, stats::information_ratio)?;
        self.metric("Calmar", RowKind::Ratio, |c| stats::calmar(&c.returns, p))?;
        self.metric("Skew", RowKind::Ratio, |c| stats::skew(&c.returns))?;
        self.metric("Kurtosis", RowKind::Ratio, |c| stats::kurtosis(&c.returns))?;
        Ok(())
    }

    fn expected_and_tail(&mut self) -> Result<(), ReportError> {
        self.separator();
        let compounded = self.config.compounded;
        let confidence = self.config.var_confidence;
        for (label, period) in [
            ("Expected Daily", None),
            ("Expected Monthly", Some(Period::Month)),
            ("Expected Yearly", Some(Period::Year)),
        ] {
            self.metric(label, RowKind::Percent, |c| {
                stats::expected_return(&c.returns, period, compounded)
            })?;
        }
        self.metric("Kelly Criterion", RowKind::Percent, |c| stats::kelly_criterion(&c.returns))?;
        self.metric("Risk of Ruin", RowKind::Percent, |c| stats::risk_of_ruin(&c.returns))?;
        self.metric("Daily Value-at-Risk", RowKind::Percent, |c| {
            Ok(-stats::value_at_risk(&c.returns, 1.0, confidence)?.abs())
        })?;
        self.metric("Expected Shortfall (cVaR)", RowKind::Percent, |c| {
            Ok(-stats::conditional_value_at_risk(&c.returns, 1.0, confidence)?.abs())
        })?;
        Ok(())
    }

    fn trade_ratios(&mut self) -> Result<(), ReportError> {
        self.separator();
        let compounded = self.config.compounded;
        self.metric("Max Consecutive Wins", RowKind::Count, |c| {
            Ok(stats::consecutive_wins(&c.returns, None, compounded)? as f64)
        })?;
        self.metric("Max Consecutive Losses", RowKind::Count, |c| {
            Ok(stats::consecutive_losses(&c.returns, None, compounded)? as f64)
        })?;
        self.metric("Gain/Pain Ratio", RowKind::Ratio, |c| {
            stats::gain_to_pain_ratio(&c.returns, 0.0, None)
        })?;
        self.metric("Gain/Pain (1M)", RowKind::Ratio, |c| {
            stats::gain_to_pain_ratio(&c.returns, 0.0, Some(Period::Month))
        })?;
        self.separator();
        self.metric("Payoff Ratio", RowKind::Ratio, |c| stats::payoff_ratio(&c.returns))?;
        self.metric("Profit Factor", RowKind::Ratio, |c| stats::profit_factor(&c.returns))?;
        self.metric("Common Sense Ratio", RowKind::Ratio, |c| {
            stats::common_sense_ratio(&c.returns)
        })?;
        self.metric("CPC Index", RowKind::Ratio, |c| stats::cpc_index(&c.returns))?;
        self.metric("Tail Ratio", RowKind::Ratio, |c| stats::tail_ratio(&c.returns, 0.95))?;
        self.metric("Outlier Win Ratio", RowKind::Ratio, |c| {
            stats::outlier_win_ratio(&c.returns, 0.99)
        })?;
        self.metric("Outlier Loss Ratio", RowKind::Ratio, |c| {
            stats::outlier_loss_ratio(&c.returns, 0.01)
        })?;
        Ok(())
    }

    fn period_returns(&mut self) -> Result<(), ReportError> {
        self.separator();
        let (compounded, p) = (self.config.compounded, self.periods());
        for (label, window) in PERIOD_WINDOWS {
            self.cells(label, RowKind::Percent, |c| {
                let start = window.start(c.returns.last_date());
                let Some(slice) = c.returns.slice_from(start) else {
                    return Ok(Cell::Unavailable);
                };
                let v = if window.annualized() {
                    stats::cagr(&slice, 0.0, compounded, p)?
                } else {
                    total(&slice, compounded)?
                };
                Ok(Cell::number(v))
            })?;
        }
        Ok(())
    }

    fn best_worst(&mut self) -> Result<(), ReportError> {
        self.separator();
        let compounded = self.config.compounded;
        for (name, period) in [
            ("Day", None),
            ("Month", Some(Period::Month)),
            ("Year", Some(Period::Year)),
        ] {
            self.metric(&format!("Best {name}"), RowKind::Percent, |c| {
                stats::best(&c.returns, period, compounded)
            })?;
            self.metric(&format!("Worst {name}"), RowKind::Percent, |c| {
                stats::worst(&c.returns, period, compounded)
            })?;
        }
        Ok(())
    }

    fn win_rates(&mut self) -> Result<(), ReportError> {
        self.separator();
        let compounded = self.config.compounded;
        let monthly = |c: &Column| aggregate_returns(&c.returns, Some(Period::Month), compounded);
        self.metric("Avg. Up Month", RowKind::Percent, |c| stats::avg_win(&monthly(c)))?;
        self.metric("Avg. Down Month", RowKind::Percent, |c| stats::avg_loss(&monthly(c)))?;
        self.metric("Win Days", RowKind::Count, |c| {
            Ok(c.returns.values().iter().filter(|v| **v > 0.0).count() as f64)
        })?;
        self.metric("Loss Days", RowKind::Count, |c| {
            Ok(c.returns.values().iter().filter(|v| **v < 0.0).count() as f64)
        })?;
        for (label, period) in [
            ("Win Days %", None),
            ("Win Month %", Some(Period::Month)),
            ("Win Quarter %", Some(Period::Quarter)),
            ("Win Year %", Some(Period::Year)),
        ] {
            self.metric(label, RowKind::Percent, |c| {
                stats::win_rate(&c.returns, period, compounded)
            })?;
        }
        Ok(())
    }

    fn greeks(&mut self) -> Result<(), ReportError> {
        if self.benchmark.is_none() {
            return Ok(());
        }
        self.separator();
        let (rf, p) = (self.config.rf, self.periods());
        self.relative("Beta", RowKind::Ratio, |r, b| Ok(stats::greeks(r, b, p)?.beta))?;
        self.relative("Alpha", RowKind::Ratio, |r, b| Ok(stats::greeks(r, b, p)?.alpha))?;
        self.relative("Correlation", RowKind::Percent, stats::benchmark_correlation)?;
        self.relative("Treynor Ratio", RowKind::Percent, |r, b| {
            stats::treynor_ratio(r, b, rf, p)
        })?;
        Ok(())
    }
}

fn total(returns: &ReturnSeries, compounded: bool) -> perflab_core::Result<f64> {
    if compounded {
        stats::comp(returns)
    } else {
        Ok(returns.values().iter().sum())
    }
}

// ─── Trailing windows ───────────────────────────────────────────────

/// Trailing window measured back from the last observation.
#[derive(Debug, Clone, Copy)]
enum Window {
    MonthToDate,
    YearToDate,
    /// Cumulative return over the trailing months.
    Months(u32),
    /// Annualized return over the trailing months.
    AnnualizedMonths(u32),
    AllTime,
}

const PERIOD_WINDOWS: [(&str, Window); 9] = [
    ("MTD", Window::MonthToDate),
    ("3M", Window::Months(3)),
    ("6M", Window::Months(6)),
    ("YTD", Window::YearToDate),
    ("1Y", Window::Months(12)),
    ("3Y (ann.)", Window::AnnualizedMonths(35)),
    ("5Y (ann.)", Window::AnnualizedMonths(59)),
    ("10Y (ann.)", Window::AnnualizedMonths(120)),
    ("All-time (ann.)", Window::AllTime),
];

impl Window {
    fn start(self, last: NaiveDate) -> NaiveDate {
        match self {
            Window::MonthToDate => last.with_day(1).unwrap_or(last),
            Window::YearToDate => last.with_ordinal(1).unwrap_or(last),
            Window::Months(m) | Window::AnnualizedMonths(m) => last
                .checked_sub_months(Months::new(m))
                .unwrap_or(NaiveDate::MIN),
            Window::AllTime => NaiveDate::MIN,
        }
    }

    fn annualized(self) -> bool {
        matches!(self, Window::AnnualizedMonths(_) | Window::AllTime)
    }
}
