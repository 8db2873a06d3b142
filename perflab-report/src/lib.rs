//! PerfLab Report: performance tables on top of `perflab-core`.
//!
//! This crate provides:
//! - The metrics table builder (basic and full layouts, optional benchmark)
//! - A numeric table with display formatting and plain-text rendering
//! - Report configuration loaded from TOML
//! - A free-form parameters section for rendering alongside the table

pub mod builder;
pub mod config;
pub mod error;
pub mod parameters;
pub mod table;

pub use builder::metrics;
pub use config::{DisplayOptions, MetricsConfig, Mode};
pub use error::ReportError;
pub use parameters::Parameters;
pub use table::{Cell, DisplayRow, DisplayTable, MetricRow, MetricTable, RowKind};
