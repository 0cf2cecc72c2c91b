//! Output formatting for exported row sets
//!
//! CSV columns are the union of all row keys in order of first appearance.
//! A row without a given key emits an empty cell. Strings are written raw,
//! numbers and booleans as their JSON text, `null` as an empty cell, and
//! nested arrays or objects as compact JSON.

use crate::error::{CommonError, Result};
use crate::rows::RowSet;
use crate::types::ExportFormat;
use serde_json::Value;

/// Title used when sanitizing leaves nothing behind
pub const FALLBACK_FILENAME: &str = "dataset";

/// Serialize rows in the requested format
pub fn encode(rows: &RowSet, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Json => to_json(rows),
        ExportFormat::Csv => to_csv(rows),
    }
}

/// Serialize rows as a JSON array
pub fn to_json(rows: &RowSet) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(rows)?)
}

/// Serialize rows as comma-separated values with a header row
///
/// An empty row set yields empty output with no header.
pub fn to_csv(rows: &RowSet) -> Result<Vec<u8>> {
    let columns = rows.columns();
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&columns)?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| row.get(column).map(cell_text).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| CommonError::Io(e.into_error()))
}

/// Text of one CSV cell
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Make a dataset title safe for a `Content-Disposition` filename
///
/// Whitespace runs become a single `_`, then every character outside
/// `[A-Za-z0-9_-]` is dropped. Distinct titles may collide.
pub fn sanitize_filename(title: &str) -> String {
    let mut collapsed = String::with_capacity(title.len());
    let mut in_whitespace = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push('_');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Download filename for a dataset title and extension
pub fn filename(title: &str, ext: &str) -> String {
    let stem = sanitize_filename(title);
    if stem.is_empty() {
        format!("{}.{}", FALLBACK_FILENAME, ext)
    } else {
        format!("{}.{}", stem, ext)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn rows(value: Value) -> RowSet {
        RowSet::from_json(value).unwrap()
    }

    fn read_back(bytes: &[u8]) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes);
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Data (v2)!!"), "My_Data_v2");
        assert_eq!(sanitize_filename("EV Fleet Data"), "EV_Fleet_Data");
        assert_eq!(sanitize_filename("a \t\n b"), "a_b");
        assert_eq!(sanitize_filename("keep-this_one"), "keep-this_one");
        assert_eq!(sanitize_filename("Café über"), "Caf_ber");
    }

    #[test]
    fn test_filename_appends_extension() {
        assert_eq!(filename("EV Fleet Data", "csv"), "EV_Fleet_Data.csv");
        assert_eq!(filename("(!!)", "json"), "dataset.json");
    }

    #[test]
    fn test_to_csv_simple() {
        let csv = to_csv(&rows(json!([{"a": 1, "b": 2}]))).unwrap();
        assert_eq!(csv, b"a,b\n1,2\n");
    }

    #[test]
    fn test_to_csv_empty_has_no_header() {
        assert!(to_csv(&RowSet::new()).unwrap().is_empty());
        assert!(to_csv(&rows(json!([{}]))).unwrap().is_empty());
    }

    #[test]
    fn test_to_csv_union_of_columns() {
        let csv = to_csv(&rows(json!([{"a": 1}, {"b": true, "a": null}]))).unwrap();
        assert_eq!(String::from_utf8(csv).unwrap(), "a,b\n1,\n,true\n");
    }

    #[test]
    fn test_to_csv_quotes_special_characters() {
        let csv = to_csv(&rows(json!([{"text": "a,b \"c\"\nd"}]))).unwrap();
        assert_eq!(
            String::from_utf8(csv.clone()).unwrap(),
            "text\n\"a,b \"\"c\"\"\nd\"\n"
        );
        assert_eq!(read_back(&csv)[1][0], "a,b \"c\"\nd");
    }

    #[test]
    fn test_to_csv_nested_values_as_json() {
        let csv = to_csv(&rows(json!([{"tags": ["x", "y"], "meta": {"k": 1}}]))).unwrap();
        let records = read_back(&csv);
        assert_eq!(records[1][0], r#"["x","y"]"#);
        assert_eq!(records[1][1], r#"{"k":1}"#);
    }

    #[test]
    fn test_to_json_round_trips() {
        let original = rows(json!([{"a": 1, "b": "two"}]));
        let bytes = to_json(&original).unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, json!([{"a": 1, "b": "two"}]));
    }

    #[test]
    fn test_json_and_csv_are_row_equivalent() {
        let original = rows(json!([{"id": 1, "ok": false, "name": "x"}, {"id": 2, "ok": true, "name": "y"}]));
        let json_rows: Vec<Value> = serde_json::from_slice(&to_json(&original).unwrap()).unwrap();
        let csv_records = read_back(&to_csv(&original).unwrap());
        let header = &csv_records[0];
        for (json_row, csv_row) in json_rows.iter().zip(&csv_records[1..]) {
            for (column, cell) in header.iter().zip(csv_row) {
                assert_eq!(&cell_text(&json_row[column]), cell);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_csv_round_trip(values in proptest::collection::vec(
            proptest::collection::vec("[a-zA-Z0-9 ,\"\n]{0,12}", 3),
            1..8,
        )) {
            let columns = ["first", "second", "third"];
            let set: RowSet = values
                .iter()
                .map(|cells| {
                    columns
                        .iter()
                        .zip(cells)
                        .map(|(c, v)| (c.to_string(), Value::String(v.clone())))
                        .collect()
                })
                .collect();

            let bytes = to_csv(&set).unwrap();
            let mut reader = csv::Reader::from_reader(bytes.as_slice());
            let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
            prop_assert_eq!(header, columns.to_vec());

            let decoded: Vec<Vec<String>> = reader
                .records()
                .map(|r| r.unwrap().iter().map(str::to_string).collect())
                .collect();
            prop_assert_eq!(decoded, values);
        }
    }
}
