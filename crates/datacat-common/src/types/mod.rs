//! Catalog records and export enums shared by the server and its tests

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A catalog dataset as read by the export pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub dataset_type: String,
    pub is_active: bool,
    pub downloads: i32,
}

/// One access parameter row (`field = value`) scoped to a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessInfo {
    pub id: i32,
    pub dataset_id: i32,
    pub field: String,
    pub value: String,
}

impl AccessInfo {
    pub fn new(id: i32, dataset_id: i32, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            dataset_id,
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Backend kind that holds a dataset's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    RestApi,
    Database,
    Ftp,
}

impl ExportKind {
    /// Path segment used by the per-kind download routes
    pub fn route_segment(self) -> &'static str {
        match self {
            ExportKind::RestApi => "rest_api",
            ExportKind::Database => "database",
            ExportKind::Ftp => "ftp",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_segment())
    }
}

/// Output format requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("Unsupported format: {}", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
