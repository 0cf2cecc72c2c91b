//! Datacat Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and pure data transformations for the dataset export service.
//!
//! # Overview
//!
//! - **Error Handling**: [`CommonError`] and the crate [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Types**: catalog records (datasets, access info) and export enums
//! - **Rows**: the normalized [`rows::RowSet`] every connector produces
//! - **Format**: JSON/CSV serialization and download filenames
//! - **Source**: decoding of downloaded files (CSV, JSON, gzip)
//!
//! # Example
//!
//! ```
//! use datacat_common::format::{filename, to_csv};
//! use datacat_common::rows::RowSet;
//!
//! let rows = RowSet::from_json(serde_json::json!([{"a": 1, "b": 2}])).unwrap();
//! assert_eq!(to_csv(&rows).unwrap(), b"a,b\n1,2\n");
//! assert_eq!(filename("EV Fleet Data", "csv"), "EV_Fleet_Data.csv");
//! ```

pub mod compression;
pub mod error;
pub mod format;
pub mod logging;
pub mod rows;
pub mod source;
pub mod types;

pub use error::{CommonError, Result};
