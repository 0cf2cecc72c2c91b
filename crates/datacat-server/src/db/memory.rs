//! In-memory catalog used by tests and local demos

use super::{AccessInfoStore, DatasetStore, DbError, DbResult};
use async_trait::async_trait;
use datacat_common::types::{AccessInfo, Dataset};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    datasets: HashMap<i32, Dataset>,
    access_info: Vec<AccessInfo>,
}

/// Catalog held in process memory
///
/// Counter increments happen under one lock, so concurrent exports never
/// lose an update.
#[derive(Default)]
pub struct InMemoryCatalog {
    tables: Mutex<Tables>,
    fail_increments: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dataset with the given id and title
    pub fn with_dataset(self, id: i32, title: &str, dataset_type: &str) -> Self {
        self.lock().datasets.insert(
            id,
            Dataset {
                id,
                title: title.to_string(),
                description: None,
                dataset_type: dataset_type.to_string(),
                is_active: true,
                downloads: 0,
            },
        );
        self
    }

    /// Add one access info row for a dataset
    pub fn with_access_info(self, dataset_id: i32, field: &str, value: &str) -> Self {
        {
            let mut tables = self.lock();
            let id = tables.access_info.len() as i32 + 1;
            tables
                .access_info
                .push(AccessInfo::new(id, dataset_id, field, value));
        }
        self
    }

    /// Make every counter increment fail
    pub fn set_fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }

    /// Current download count of a dataset
    pub fn downloads(&self, id: i32) -> Option<i32> {
        self.lock().datasets.get(&id).map(|d| d.downloads)
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DatasetStore for InMemoryCatalog {
    async fn get_dataset_title(&self, id: i32) -> DbResult<Option<String>> {
        Ok(self.lock().datasets.get(&id).map(|d| d.title.clone()))
    }

    async fn increment_downloads(&self, id: i32) -> DbResult<()> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("increments disabled".to_string()));
        }
        match self.lock().datasets.get_mut(&id) {
            Some(dataset) => {
                dataset.downloads += 1;
                Ok(())
            },
            None => Err(DbError::not_found("Dataset", id)),
        }
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

#[async_trait]
impl AccessInfoStore for InMemoryCatalog {
    async fn list_access_info(&self, dataset_id: i32) -> DbResult<Vec<AccessInfo>> {
        Ok(self
            .lock()
            .access_info
            .iter()
            .filter(|info| info.dataset_id == dataset_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_and_increment() {
        let catalog = InMemoryCatalog::new().with_dataset(1, "Rivers", "FTP");
        assert_eq!(catalog.get_dataset_title(1).await.unwrap().as_deref(), Some("Rivers"));
        assert_eq!(catalog.get_dataset_title(2).await.unwrap(), None);

        catalog.increment_downloads(1).await.unwrap();
        catalog.increment_downloads(1).await.unwrap();
        assert_eq!(catalog.downloads(1), Some(2));
        assert!(catalog.increment_downloads(2).await.is_err());
    }

    #[tokio::test]
    async fn test_access_info_scoped_to_dataset() {
        let catalog = InMemoryCatalog::new()
            .with_access_info(1, "api_url", "https://example.com")
            .with_access_info(2, "ftp_host", "ftp.example.com");
        let rows = catalog.list_access_info(1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field, "api_url");
    }

    #[tokio::test]
    async fn test_failing_increments() {
        let catalog = InMemoryCatalog::new().with_dataset(1, "Rivers", "FTP");
        catalog.set_fail_increments(true);
        assert!(matches!(
            catalog.increment_downloads(1).await,
            Err(DbError::Unavailable(_))
        ));
        assert_eq!(catalog.downloads(1), Some(0));
    }
}
