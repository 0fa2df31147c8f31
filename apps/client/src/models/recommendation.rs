//! Result table returned by `POST /recommend`.
//!
//! The service does not declare a schema: every row is a JSON object whose
//! keys are column names. Rows keep the key order the server sent, which needs
//! `serde_json`'s `preserve_order` feature.

use serde::Deserialize;
use serde_json::{Map, Number, Value};
use tracing::warn;

/// One cell value. Anything that is not text or a number is carried as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Absent,
}

impl Scalar {
    /// Textual form used in the rendered table. `None` for absent values.
    pub fn display(&self) -> Option<String> {
        match self {
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Number(n) => Some(format_number(n)),
            Scalar::Absent => None,
        }
    }
}

impl From<Value> for Scalar {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Scalar::Absent,
            Value::String(s) => Scalar::Text(s),
            Value::Number(n) => Scalar::Number(n),
            // Not part of the wire contract; keep it visible rather than lose it
            other => Scalar::Text(other.to_string()),
        }
    }
}

/// Integers print as integers, including floats with no fractional part.
fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => format!("{f}"),
        None => n.to_string(),
    }
}

/// One result record: (column, value) pairs in server order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<(String, Scalar)>,
}

impl Row {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    /// Value for `column`, or `None` if this row has no such key.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.cells.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            cells: map.into_iter().map(|(k, v)| (k, Scalar::from(v))).collect(),
        }
    }
}

/// Ordered rows for one query. Decoding never fails on shape: a body that is
/// JSON but not `{ "table": [ {..}, .. ] }` decodes as an empty result.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "Value")]
pub struct RecommendationResult {
    pub rows: Vec<Row>,
    /// Count the service reports next to the table. Informational only.
    pub results_count: Option<u64>,
}

impl RecommendationResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Value> for RecommendationResult {
    fn from(value: Value) -> Self {
        let Value::Object(mut body) = value else {
            warn!("Recommendation response is not a JSON object; treating as empty");
            return Self::default();
        };

        let results_count = body.get("results_count").and_then(Value::as_u64);

        let rows = match body.remove("table") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => rows.push(Row::from(map)),
                        other => {
                            warn!("Table entry is not an object ({other}); treating table as empty");
                            return Self {
                                rows: Vec::new(),
                                results_count,
                            };
                        }
                    }
                }
                rows
            }
            Some(other) => {
                warn!("`table` is not an array ({other}); treating as empty");
                Vec::new()
            }
        };

        Self {
            rows,
            results_count,
        }
    }
}
