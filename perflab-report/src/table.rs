//! The metrics table: an ordered list of labelled rows, one cell per column.
//!
//! The table stores raw numbers (fractions, not percentages). Presentation
//! happens only in [`MetricTable::display`], which keeps the numeric table
//! available for programmatic use.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::DisplayOptions;

/// One value of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    /// The metric could not be computed for this column.
    Unavailable,
}

impl Cell {
    /// Wraps a number; anything non-finite becomes [`Cell::Unavailable`].
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Unavailable
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Cell::Unavailable)
    }
}

/// How the numbers of a row are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Fraction shown as a percentage.
    Percent,
    Ratio,
    /// Calendar days, shown as an integer.
    Days,
    Count,
    Date,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum MetricRow {
    /// Blank row between sections.
    Separator,
    Metric {
        label: String,
        kind: RowKind,
        cells: Vec<Cell>,
    },
}

impl MetricRow {
    pub fn label(&self) -> Option<&str> {
        match self {
            MetricRow::Separator => None,
            MetricRow::Metric { label, .. } => Some(label),
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, MetricRow::Separator)
    }
}

/// Ordered metrics table. Columns are the benchmark (when present) followed
/// by the strategies in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    columns: Vec<String>,
    rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    /// Appends a section break. Leading and repeated breaks are collapsed.
    pub fn push_separator(&mut self) {
        if matches!(self.rows.last(), Some(MetricRow::Metric { .. })) {
            self.rows.push(MetricRow::Separator);
        }
    }

    pub fn push_metric(&mut self, label: impl Into<String>, kind: RowKind, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.push(MetricRow::Metric {
            label: label.into(),
            kind,
            cells,
        });
    }

    /// Row labels in table order, separators skipped.
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().filter_map(MetricRow::label).collect()
    }

    pub fn metric_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_separator()).count()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.rows.iter().any(|r| r.label() == Some(label))
    }

    pub fn get(&self, label: &str, column: &str) -> Option<&Cell> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.iter().find_map(|row| match row {
            MetricRow::Metric { label: l, cells, .. } if l == label => cells.get(col),
            _ => None,
        })
    }

    /// Numeric value of a cell, `None` for text, dates and unavailable cells.
    pub fn value(&self, label: &str, column: &str) -> Option<f64> {
        self.get(label, column).and_then(Cell::as_f64)
    }

    pub fn without_separators(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| !r.is_separator())
                .cloned()
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Formats every cell as text. Percent rows are scaled by 100 and
    /// suffixed with `%`; day and count rows are rounded to integers.
    /// Separators present in the table become blank rows.
    pub fn display(&self, opts: &DisplayOptions) -> DisplayTable {
        let rows = self
            .rows
            .iter()
            .map(|row| match row {
                MetricRow::Separator => DisplayRow {
                    label: String::new(),
                    cells: vec![String::new(); self.columns.len()],
                },
                MetricRow::Metric { label, kind, cells } => DisplayRow {
                    label: label.clone(),
                    cells: cells.iter().map(|c| format_cell(c, *kind, opts)).collect(),
                },
            })
            .collect();
        DisplayTable {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn render_text(&self, opts: &DisplayOptions) -> String {
        self.display(opts).render_text()
    }
}

fn format_cell(cell: &Cell, kind: RowKind, opts: &DisplayOptions) -> String {
    let d = opts.decimals;
    match cell {
        Cell::Unavailable => opts.unavailable_marker.clone(),
        Cell::Text(s) => s.clone(),
        Cell::Date(date) => date.format("%Y-%m-%d").to_string(),
        Cell::Number(v) => match kind {
            RowKind::Percent => format!("{:.*}%", d, v * 100.0),
            RowKind::Days | RowKind::Count => format!("{:.0}", v.round()),
            RowKind::Ratio | RowKind::Date | RowKind::Text => format!("{:.*}", d, v),
        },
    }
}

/// A formatted table, ready to print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayTable {
    pub columns: Vec<String>,
    pub rows: Vec<DisplayRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    /// Empty for separators.
    pub label: String,
    pub cells: Vec<String>,
}

impl DisplayTable {
    pub fn get(&self, label: &str, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.label == label)
            .and_then(|r| r.cells.get(col))
            .map(String::as_str)
    }

    /// Fixed-width plain text: labels left-aligned, values right-aligned,
    /// a rule under the header.
    pub fn render_text(&self) -> String {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.chars().count())
            .max()
            .unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.cells.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&format!("{:<label_width$}", ""));
        for (header, w) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {header:>w$}"));
        }
        out.push('\n');
        let rule = label_width + widths.iter().map(|w| w + 2).sum::<usize>();
        out.push_str(&"-".repeat(rule));
        out.push('\n');

        for row in &self.rows {
            let mut line = format!("{:<label_width$}", row.label);
            for (cell, w) in row.cells.iter().zip(&widths) {
                line.push_str(&format!("  {cell:>w$}"));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}
