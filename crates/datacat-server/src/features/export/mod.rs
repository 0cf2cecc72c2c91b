//! Dataset export
//!
//! Loads a dataset's access parameters, picks the connector they describe,
//! fetches the data into a row set and serves it as a JSON or CSV file.
//!
//! - `params` - access parameter folding and masking
//! - `resolver` - connector selection
//! - `connectors/` - REST, database and FTP backends
//! - `queries/` - the export pipeline
//! - `routes.rs` - `/download` endpoints

pub mod connectors;
pub mod params;
pub mod queries;
pub mod resolver;
pub mod routes;

pub use connectors::{ConnectorError, Connectors};
pub use params::AccessParams;
pub use queries::{ExportDatasetQuery, ExportError, ExportedFile};
pub use resolver::{ConfigurationError, ConnectorConfig};
pub use routes::export_routes;
