//! Normalized tabular rows
//!
//! Every connector hands its result to the formatter as a [`RowSet`]: an
//! ordered list of records, each record an ordered `field -> value` map.
//! Field order inside a record follows the source (JSON object order, SQL
//! column order, CSV header order).

use crate::error::{CommonError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One record of a row set
pub type Row = Map<String, Value>;

/// Field name used when a JSON array holds scalars instead of objects
pub const SCALAR_FIELD: &str = "value";

/// Ordered collection of flat records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RowSet {
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Normalize an arbitrary JSON document into rows
    ///
    /// - an array of objects becomes one row per object
    /// - array elements that are not objects become `{"value": <element>}`
    /// - a single top-level object becomes a one-row set
    /// - any other top-level value is rejected
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Self {
                rows: items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(map) => map,
                        other => {
                            let mut row = Row::new();
                            row.insert(SCALAR_FIELD.to_string(), other);
                            row
                        },
                    })
                    .collect(),
            }),
            Value::Object(map) => Ok(Self { rows: vec![map] }),
            other => Err(CommonError::UnexpectedShape(format!(
                "expected a JSON array or object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Union of field names across all rows, in order of first appearance
    pub fn columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }
}

impl FromIterator<Row> for RowSet {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_objects() {
        let rows = RowSet::from_json(json!([{"a": 1}, {"a": 2, "b": "x"}])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows()[1]["b"], "x");
    }

    #[test]
    fn test_single_object_is_one_row() {
        let rows = RowSet::from_json(json!({"id": 5, "name": "solo"})).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows()[0]["name"], "solo");
    }

    #[test]
    fn test_scalar_elements_are_wrapped() {
        let rows = RowSet::from_json(json!([1, "two", null])).unwrap();
        assert_eq!(rows.columns(), vec![SCALAR_FIELD.to_string()]);
        assert_eq!(rows.rows()[1][SCALAR_FIELD], "two");
    }

    #[test]
    fn test_top_level_scalar_rejected() {
        let err = RowSet::from_json(json!("nope")).unwrap_err();
        assert!(matches!(err, CommonError::UnexpectedShape(_)));
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn test_columns_preserve_first_seen_order() {
        let rows = RowSet::from_json(json!([
            {"z": 1, "a": 2},
            {"a": 3, "m": 4},
        ]))
        .unwrap();
        assert_eq!(rows.columns(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let rows = RowSet::from_json(json!([{"a": 1}])).unwrap();
        assert_eq!(serde_json::to_string(&rows).unwrap(), r#"[{"a":1}]"#);
    }
}
