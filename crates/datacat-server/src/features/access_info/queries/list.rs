use crate::db::{AccessInfoStore, DatasetStore, DbError};
use crate::features::export::params::masked_value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAccessInfoQuery {
    pub dataset_id: String,
}

/// One access info row as shown to catalog users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessInfoItem {
    pub id: i32,
    pub field: String,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ListAccessInfoError {
    #[error("Invalid datasetId")]
    InvalidDatasetId,
    #[error("Dataset not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl ListAccessInfoQuery {
    pub fn validate(&self) -> Result<i32, ListAccessInfoError> {
        self.dataset_id
            .trim()
            .parse()
            .map_err(|_| ListAccessInfoError::InvalidDatasetId)
    }
}

#[tracing::instrument(skip(datasets, access_info))]
pub async fn handle(
    datasets: &dyn DatasetStore,
    access_info: &dyn AccessInfoStore,
    query: ListAccessInfoQuery,
) -> Result<Vec<AccessInfoItem>, ListAccessInfoError> {
    let dataset_id = query.validate()?;

    if datasets.get_dataset_title(dataset_id).await?.is_none() {
        return Err(ListAccessInfoError::NotFound);
    }

    let items = access_info
        .list_access_info(dataset_id)
        .await?
        .into_iter()
        .map(|info| AccessInfoItem {
            value: masked_value(&info.field, &info.value),
            id: info.id,
            field: info.field,
        })
        .collect();

    Ok(items)
}
