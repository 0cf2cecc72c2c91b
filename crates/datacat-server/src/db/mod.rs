//! Catalog database access
//!
//! The export pipeline only needs three things from the catalog: a dataset
//! title, the dataset's access info rows, and an atomic download counter.
//! Those are expressed as the [`DatasetStore`] and [`AccessInfoStore`]
//! traits, implemented for Postgres by [`PgCatalogStore`] and in memory by
//! [`InMemoryCatalog`].

pub mod catalog;
pub mod memory;

pub use catalog::{AccessInfoStore, DatasetStore, PgCatalogStore};
pub use memory::InMemoryCatalog;

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Catalog store errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration failure at startup
    #[error("Database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Store cannot serve requests right now
    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),
}

impl DbError {
    pub fn not_found(resource_type: &str, identifier: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} '{}' not found", resource_type, identifier))
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Create the catalog connection pool
pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Apply the embedded catalog migrations
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Dataset", 42);
        assert_eq!(err.to_string(), "Dataset '42' not found");
    }
}
