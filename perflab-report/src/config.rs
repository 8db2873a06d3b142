//! Report configuration, passed explicitly to every table build.
//!
//! Configuration is plain data: it can be constructed in code, parsed from a
//! TOML string or loaded from a file. Missing keys take their defaults.
//!
//! ```toml
//! rf = 0.04
//! periods_per_year = 252
//! mode = "full"
//! benchmark_title = "SPY"
//! ```

use std::path::Path;

use perflab_core::prepare::PrepareOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReportError;

/// Amount of detail in the metrics table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Basic,
    Full,
}

impl Mode {
    pub fn is_full(self) -> bool {
        self == Mode::Full
    }
}

/// Parameters for [`crate::metrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Annual risk-free rate.
    pub rf: f64,
    pub periods_per_year: u32,
    /// Compound returns (otherwise sum them) when totalling and aggregating.
    pub compounded: bool,
    pub mode: Mode,
    /// Trim strategy and benchmark to a common start date.
    pub match_dates: bool,
    /// Run price detection and NaN trimming on the inputs. When false the
    /// inputs are taken as clean returns and only interior gaps are zeroed.
    pub prepare_returns: bool,
    pub strategy_title: String,
    pub benchmark_title: String,
    /// Keep blank separator rows between sections.
    pub sep: bool,
    /// Confidence level for VaR and CVaR rows.
    pub var_confidence: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            rf: 0.0,
            periods_per_year: 252,
            compounded: true,
            mode: Mode::Basic,
            match_dates: true,
            prepare_returns: true,
            strategy_title: "Strategy".into(),
            benchmark_title: "Benchmark".into(),
            sep: false,
            var_confidence: 0.95,
        }
    }
}

impl MetricsConfig {
    pub fn full() -> Self {
        Self {
            mode: Mode::Full,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ReportError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), mode = ?config.mode, "loaded metrics config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.periods_per_year == 0 {
            return Err(ReportError::Config(
                "periods_per_year must be greater than 0".into(),
            ));
        }
        if !self.rf.is_finite() {
            return Err(ReportError::Config(format!("rf must be finite, got {}", self.rf)));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(ReportError::Config(format!(
                "var_confidence must lie in (0, 1), got {}",
                self.var_confidence
            )));
        }
        Ok(())
    }

    /// Preparation options for the raw inputs. The risk-free rate is applied
    /// separately, so the table can report both raw and excess figures.
    pub(crate) fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            trim_nan: self.prepare_returns,
            detect_prices: self.prepare_returns,
            ..PrepareOptions::default()
        }
    }
}

/// Presentation settings for [`crate::MetricTable::display`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub decimals: usize,
    /// Shown in place of values that could not be computed.
    pub unavailable_marker: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            decimals: 2,
            unavailable_marker: "-".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = MetricsConfig::default();
        assert_eq!(c.periods_per_year, 252);
        assert!(c.compounded);
        assert_eq!(c.mode, Mode::Basic);
        assert!(c.match_dates);
        assert_eq!(c.strategy_title, "Strategy");
        assert_eq!(c.benchmark_title, "Benchmark");
        assert!((c.var_confidence - 0.95).abs() < 1e-12);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = MetricsConfig::from_toml_str("rf = 0.04\nmode = \"full\"\n").unwrap();
        assert!((c.rf - 0.04).abs() < 1e-12);
        assert_eq!(c.mode, Mode::Full);
        assert_eq!(c.periods_per_year, 252);
        assert_eq!(c.strategy_title, "Strategy");
    }

    #[test]
    fn zero_periods_rejected() {
        let err = MetricsConfig::from_toml_str("periods_per_year = 0").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn confidence_out_of_range_rejected() {
        let c = MetricsConfig {
            var_confidence: 1.5,
            ..MetricsConfig::default()
        };
        assert!(matches!(c.validate(), Err(ReportError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = MetricsConfig::from_toml_str("mode = [").unwrap_err();
        assert!(matches!(err, ReportError::ConfigParse(_)));
    }

    #[test]
    fn unknown_mode_is_parse_error() {
        let err = MetricsConfig::from_toml_str("mode = \"verbose\"").unwrap_err();
        assert!(matches!(err, ReportError::ConfigParse(_)));
    }

    #[test]
    fn round_trips_through_toml() {
        let c = MetricsConfig {
            rf: 0.02,
            mode: Mode::Full,
            benchmark_title: "SPY".into(),
            ..MetricsConfig::default()
        };
        let text = toml::to_string(&c).unwrap();
        assert_eq!(MetricsConfig::from_toml_str(&text).unwrap(), c);
    }
}
