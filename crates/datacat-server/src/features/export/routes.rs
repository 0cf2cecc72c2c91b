use crate::features::FeatureState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use datacat_common::types::ExportKind;

use super::connectors::{ConnectorError, FtpError};
use super::queries::{ExportDatasetQuery, ExportError, ExportedFile};

pub fn export_routes() -> Router<FeatureState> {
    Router::new()
        .route("/download", download_route(None))
        .route("/download/rest_api", download_route(Some(ExportKind::RestApi)))
        .route("/download/database", download_route(Some(ExportKind::Database)))
        .route("/download/ftp", download_route(Some(ExportKind::Ftp)))
}

/// GET route bound to one connector kind, or to resolution when `None`
fn download_route(kind: Option<ExportKind>) -> MethodRouter<FeatureState> {
    get(
        move |State(state): State<FeatureState>, Query(query): Query<ExportDatasetQuery>| async move {
            download(state, ExportDatasetQuery { kind, ..query }).await
        },
    )
}

#[tracing::instrument(skip(state), fields(dataset_id = ?query.dataset_id))]
async fn download(state: FeatureState, query: ExportDatasetQuery) -> Result<Response, ExportError> {
    let file = super::queries::export_dataset::handle(&state, query).await?;
    Ok(file.into_response())
}

impl IntoResponse for ExportedFile {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

impl ExportError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExportError::MissingDatasetId
            | ExportError::InvalidDatasetId(_)
            | ExportError::UnsupportedFormat(_)
            | ExportError::Configuration(_) => StatusCode::BAD_REQUEST,
            ExportError::NotFound(_) => StatusCode::NOT_FOUND,
            ExportError::Upstream(_)
            | ExportError::FormatConversion(_)
            | ExportError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent to the client; upstream detail stays in the logs
    pub fn public_message(&self) -> String {
        match self {
            ExportError::Upstream(ConnectorError::Ftp(FtpError::UnsupportedFormat(_))) => {
                "Unsupported file type".to_string()
            },
            ExportError::Upstream(_) => "Failed to fetch data from source".to_string(),
            ExportError::FormatConversion(_) => "Error converting result".to_string(),
            ExportError::Catalog(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Export failed: {}", self);
        } else {
            tracing::debug!("Export rejected: {}", self);
        }

        (status, self.public_message()).into_response()
    }
}
