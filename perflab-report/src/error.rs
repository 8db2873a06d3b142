//! Errors raised while assembling or configuring a metrics table.

use std::path::PathBuf;

use perflab_core::StatsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Stats(#[from] StatsError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration error: cannot parse TOML: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("validation error: invalid benchmark: {reason}")]
    InvalidBenchmark { reason: String },
}

impl ReportError {
    /// Input problems, including those raised by the statistics engine.
    pub fn is_validation(&self) -> bool {
        match self {
            ReportError::Stats(e) => e.is_validation(),
            ReportError::InvalidBenchmark { .. } => true,
            _ => false,
        }
    }

    pub fn is_configuration(&self) -> bool {
        match self {
            ReportError::Stats(e) => e.is_configuration(),
            ReportError::Config(_) | ReportError::ConfigParse(_) => true,
            _ => false,
        }
    }
}
