//! Loading report configuration from disk.

use std::io::Write;

use perflab_core::frame::Returns;
use perflab_core::series::ReturnSeries;
use perflab_report::{metrics, MetricsConfig, Mode, ReportError};

const CONFIG: &str = r#"
rf = 0.02
periods_per_year = 365
mode = "full"
strategy_title = "Momentum"
benchmark_title = "BTC"
sep = true
var_confidence = 0.99
"#;

#[test]
fn load_from_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("report.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = MetricsConfig::load(&path).unwrap();
    assert_eq!(config.periods_per_year, 365);
    assert_eq!(config.mode, Mode::Full);
    assert_eq!(config.strategy_title, "Momentum");
    assert!(config.sep);
    assert!(config.compounded);
    assert!((config.var_confidence - 0.99).abs() < 1e-12);
}

#[test]
fn loaded_config_drives_the_table() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let config = MetricsConfig::load(file.path()).unwrap();

    let s = ReturnSeries::from_values("s", vec![0.01, -0.02, 0.015, 0.03, 0.025]).unwrap();
    let b = ReturnSeries::from_values("b", vec![0.008, 0.018, 0.013, 0.028, 0.022]).unwrap();
    let table = metrics(&Returns::from(s), Some(&b), &config).unwrap();
    assert_eq!(table.columns(), ["BTC", "Momentum"]);
    assert_eq!(table.value("Risk-Free Rate", "Momentum"), Some(0.02));
    assert!(table.contains("Treynor Ratio"));
    assert!(table.rows().iter().any(|r| r.is_separator()));
}

#[test]
fn missing_file_is_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = MetricsConfig::load(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ReportError::Io { .. }));
    assert!(!err.is_validation());
}

#[test]
fn invalid_values_in_file_are_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "var_confidence = 0.0\n").unwrap();
    let err = MetricsConfig::load(&path).unwrap_err();
    assert!(err.is_configuration());
}
