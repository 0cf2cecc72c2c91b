//! Feature modules implementing the datacat API
//!
//! Each feature is a vertical slice with its own queries and routes:
//!
//! - **export**: dataset downloads from REST, database and FTP sources
//! - **access_info**: masked listing of a dataset's connection parameters
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `queries/` - Read operations, plain async functions over store traits
//! - `routes.rs` - HTTP route definitions and error mapping

pub mod access_info;
pub mod export;

use crate::db::{AccessInfoStore, DatasetStore};
use axum::Router;
use export::Connectors;
use std::sync::Arc;
use std::time::Duration;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Dataset titles and the download counter
    pub datasets: Arc<dyn DatasetStore>,
    /// Per-dataset connection parameters
    pub access_info: Arc<dyn AccessInfoStore>,
    /// Backend connectors used by exports
    pub connectors: Connectors,
    /// Overall deadline of one export
    pub export_timeout: Duration,
}

/// Creates the router with all feature routes mounted
///
/// - `/download`, `/download/{rest_api,database,ftp}` - dataset exports
/// - `/access_info/:dataset_id` - access info listing
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .merge(export::export_routes())
        .nest("/access_info", access_info::access_info_routes())
        .with_state(state)
}
