//! Decoding of downloaded source files into rows
//!
//! The filename decides how content is read: a `.gz` suffix is decompressed
//! first and the remaining suffix (`.csv` or `.json`) picks the parser.
//! Anything else is rejected with [`CommonError::UnsupportedFormat`].

use crate::compression::{decompress_gzip, strip_gzip_suffix};
use crate::error::{CommonError, Result};
use crate::rows::{Row, RowSet};
use serde_json::Value;
use tracing::debug;

/// Parser selected for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
}

/// How a named file must be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceKind {
    pub format: SourceFormat,
    pub gzipped: bool,
}

impl SourceKind {
    /// Classify a filename by its suffixes
    pub fn detect(filename: &str) -> Result<Self> {
        let (inner, gzipped) = strip_gzip_suffix(filename);

        let format = if inner.ends_with(".csv") {
            SourceFormat::Csv
        } else if inner.ends_with(".json") {
            SourceFormat::Json
        } else if gzipped {
            return Err(CommonError::UnsupportedFormat(format!(
                "unsupported file type inside gzip archive: {}",
                filename
            )));
        } else {
            return Err(CommonError::UnsupportedFormat(filename.to_string()));
        };

        Ok(Self { format, gzipped })
    }
}

/// Decode a downloaded file into rows
///
/// The suffix is checked before any decompression, so an unsupported name
/// fails without touching the payload.
pub fn decode(filename: &str, data: &[u8]) -> Result<RowSet> {
    let kind = SourceKind::detect(filename)?;

    let decompressed;
    let content = if kind.gzipped {
        decompressed = decompress_gzip(data)?;
        decompressed.as_slice()
    } else {
        data
    };

    debug!(filename, format = ?kind.format, bytes = content.len(), "Parsing source file");

    match kind.format {
        SourceFormat::Csv => parse_csv(content),
        SourceFormat::Json => parse_json(content),
    }
}

/// Parse JSON content into rows
pub fn parse_json(data: &[u8]) -> Result<RowSet> {
    let value: Value = serde_json::from_slice(data)?;
    RowSet::from_json(value)
}

/// Parse CSV content into rows
///
/// The header row supplies field names and every cell becomes a string.
/// Cells are trimmed. Cells past the last header are named `field<N>` with
/// a 1-based column index.
pub fn parse_csv(data: &[u8]) -> Result<RowSet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = RowSet::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = record
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let name = headers
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("field{}", idx + 1));
                (name, Value::String(cell.to_string()))
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}
