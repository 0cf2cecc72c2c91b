//! Datacat Server Library
//!
//! HTTP server that exports catalog datasets as downloadable files.
//!
//! # Overview
//!
//! A dataset's access info (free-form `field`/`value` rows in the catalog)
//! says where its data lives: a REST API, a relational database or an FTP
//! file drop. An export:
//!
//! 1. loads the dataset title and access parameters from the catalog,
//! 2. picks the connector the parameters describe,
//! 3. fetches the data into rows under one deadline,
//! 4. serializes the rows as JSON or CSV,
//! 5. answers with a `Content-Disposition: attachment` response and bumps
//!    the dataset's download counter in the background.
//!
//! # Architecture
//!
//! - **Features**: vertical slices under [`features`] with queries and routes
//! - **Catalog**: [`db::DatasetStore`] and [`db::AccessInfoStore`] traits,
//!   Postgres-backed in production
//! - **Middleware**: CORS, request tracing and compression
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extractors
//! - **SQLx**: catalog access and dataset database connections
//! - **reqwest** / **suppaftp**: REST and FTP upstreams
//!
//! # Example
//!
//! ```no_run
//! use datacat_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::{ApiResult, AppError};
