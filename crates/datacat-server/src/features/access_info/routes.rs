use crate::api::response::ApiResponse;
use crate::error::{ApiResult, AppError};
use crate::features::FeatureState;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;

use super::queries::{ListAccessInfoError, ListAccessInfoQuery};

pub fn access_info_routes() -> Router<FeatureState> {
    Router::new().route("/:dataset_id", get(list_access_info))
}

#[tracing::instrument(skip(state))]
async fn list_access_info(
    State(state): State<FeatureState>,
    Path(dataset_id): Path<String>,
) -> ApiResult<Response> {
    let query = ListAccessInfoQuery { dataset_id };
    let items =
        super::queries::list::handle(state.datasets.as_ref(), state.access_info.as_ref(), query)
            .await?;

    let count = items.len();
    Ok(ApiResponse::success_with_meta(items, json!({ "count": count })).into_response())
}

impl From<ListAccessInfoError> for AppError {
    fn from(err: ListAccessInfoError) -> Self {
        match err {
            ListAccessInfoError::InvalidDatasetId => AppError::BadRequest(err.to_string()),
            ListAccessInfoError::NotFound => AppError::NotFound(err.to_string()),
            ListAccessInfoError::Database(e) => AppError::Database(e),
        }
    }
}
