//! Free-form key/value parameters shown alongside a report.
//!
//! Parameters are carried for rendering only; no metric reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::table::{DisplayRow, DisplayTable};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    entries: BTreeMap<String, serde_json::Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style [`Parameters::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Two-column table: parameter name and value, sorted by name.
    pub fn display(&self) -> DisplayTable {
        DisplayTable {
            columns: vec!["Value".into()],
            rows: self
                .iter()
                .map(|(key, value)| DisplayRow {
                    label: key.to_string(),
                    cells: vec![render_value(value)],
                })
                .collect(),
        }
    }

    pub fn render_text(&self) -> String {
        self.display().render_text()
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
