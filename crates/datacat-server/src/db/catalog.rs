//! Catalog store traits and their Postgres implementation

use super::{DbError, DbResult};
use async_trait::async_trait;
use datacat_common::types::AccessInfo;
use sqlx::PgPool;

/// Dataset lookups and the download counter
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Title of a dataset, `None` when the id does not resolve
    async fn get_dataset_title(&self, id: i32) -> DbResult<Option<String>>;

    /// Add one to the dataset's download counter in a single atomic step
    async fn increment_downloads(&self, id: i32) -> DbResult<()>;

    /// Cheap connectivity check for health endpoints
    async fn ping(&self) -> DbResult<()>;
}

/// Access info lookups
#[async_trait]
pub trait AccessInfoStore: Send + Sync {
    /// All access info rows of a dataset, oldest first
    async fn list_access_info(&self, dataset_id: i32) -> DbResult<Vec<AccessInfo>>;
}

/// Postgres-backed catalog
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatasetStore for PgCatalogStore {
    async fn get_dataset_title(&self, id: i32) -> DbResult<Option<String>> {
        let title = sqlx::query_scalar::<_, String>("SELECT title FROM datasets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(title)
    }

    async fn increment_downloads(&self, id: i32) -> DbResult<()> {
        let result = sqlx::query("UPDATE datasets SET downloads = downloads + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Dataset", id));
        }
        Ok(())
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AccessInfoStore for PgCatalogStore {
    async fn list_access_info(&self, dataset_id: i32) -> DbResult<Vec<AccessInfo>> {
        let rows = sqlx::query_as::<_, (i32, i32, String, String)>(
            r#"
            SELECT id, dataset_id, field, value
            FROM dataset_access_info
            WHERE dataset_id = $1
            ORDER BY id
            "#,
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, dataset_id, field, value)| AccessInfo {
                id,
                dataset_id,
                field,
                value,
            })
            .collect())
    }
}
