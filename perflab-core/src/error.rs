//! Structured error types for the statistics engine.
//!
//! Two families exist: validation errors (bad input, raised before any
//! computation) and configuration errors (parameters that cannot be combined).
//! Numeric degeneracies such as zero variance are never errors; metrics absorb
//! them into documented sentinel values.

use chrono::NaiveDate;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("validation error: series '{series}' is empty")]
    EmptySeries { series: String },

    #[error("validation error: series '{series}' has non-numeric value {raw:?} at position {position}")]
    NonNumeric {
        series: String,
        position: usize,
        raw: String,
    },

    #[error("validation error: price series '{series}' has non-positive or non-finite price at {date}")]
    NonFinitePrice { series: String, date: NaiveDate },

    #[error("validation error: series '{series}' index is not strictly increasing at {date}")]
    UnsortedIndex { series: String, date: NaiveDate },

    #[error("validation error: {what} length mismatch ({left} vs {right})")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("validation error: column '{series}' does not share the frame index")]
    IndexMismatch { series: String },

    #[error("validation error: duplicate column name '{series}'")]
    DuplicateColumn { series: String },

    #[error("validation error: benchmark cannot be aligned with '{series}': {reason}")]
    BenchmarkAlignment { series: String, reason: String },

    #[error("validation error: risk-free series has no value for {date}")]
    RiskFreeAlignment { date: NaiveDate },

    #[error("validation error: invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("configuration error: periods per year must be provided when rf != 0")]
    MissingPeriods,

    #[error("configuration error: periods per year must be positive")]
    InvalidPeriods,

    #[error("configuration error: series '{series}' already carries a different risk-free rate")]
    RiskFreeConflict { series: String },
}

impl StatsError {
    /// True for input problems (empty, non-numeric, un-alignable).
    pub fn is_validation(&self) -> bool {
        !self.is_configuration()
    }

    /// True for parameter combinations that cannot be honored.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StatsError::MissingPeriods
                | StatsError::InvalidPeriods
                | StatsError::RiskFreeConflict { .. }
        )
    }
}
