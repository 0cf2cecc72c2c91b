use crate::db::{DatasetStore, DbError};
use crate::features::export::connectors::ConnectorError;
use crate::features::export::params;
use crate::features::export::resolver::{self, ConfigurationError};
use crate::features::FeatureState;
use datacat_common::format;
use datacat_common::types::{ExportFormat, ExportKind};
use datacat_common::CommonError;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::Instant;

/// Export one dataset as a downloadable file
///
/// `kind` is set by the per-backend routes; the generic route leaves it
/// empty and lets the access info decide.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportDatasetQuery {
    #[serde(rename = "datasetId")]
    pub dataset_id: Option<String>,
    pub format: Option<String>,
    #[serde(skip)]
    pub kind: Option<ExportKind>,
}

/// Serialized export ready to be sent
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub kind: ExportKind,
    pub rows: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Missing datasetId")]
    MissingDatasetId,
    #[error("Invalid datasetId")]
    InvalidDatasetId(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dataset not found")]
    NotFound(i32),
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Upstream fetch failed: {0}")]
    Upstream(#[from] ConnectorError),
    #[error("Error converting result: {0}")]
    FormatConversion(#[source] CommonError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] DbError),
}

impl ExportDatasetQuery {
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: Some(dataset_id.into()),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_kind(mut self, kind: ExportKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Parse the dataset id and output format
    pub fn validate(&self) -> Result<(i32, ExportFormat), ExportError> {
        let raw_id = self
            .dataset_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ExportError::MissingDatasetId)?;
        let dataset_id = raw_id
            .parse::<i32>()
            .map_err(|_| ExportError::InvalidDatasetId(raw_id.to_string()))?;

        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") => ExportFormat::default(),
            Some(raw) => raw
                .parse()
                .map_err(|_| ExportError::UnsupportedFormat(raw.to_string()))?,
        };

        Ok((dataset_id, format))
    }
}

#[tracing::instrument(skip(state), fields(kind = ?query.kind))]
pub async fn handle(
    state: &FeatureState,
    query: ExportDatasetQuery,
) -> Result<ExportedFile, ExportError> {
    let (dataset_id, export_format) = query.validate()?;

    let title = state
        .datasets
        .get_dataset_title(dataset_id)
        .await?
        .ok_or(ExportError::NotFound(dataset_id))?;

    let access_params = params::load(state.access_info.as_ref(), dataset_id).await?;
    let config = match query.kind {
        Some(kind) => resolver::for_kind(kind, &access_params)?,
        None => resolver::resolve(&access_params)?,
    };
    let kind = config.kind();

    let deadline = Instant::now() + state.export_timeout;
    let rows = state.connectors.fetch(&config, deadline).await?;

    let body = format::encode(&rows, export_format).map_err(ExportError::FormatConversion)?;

    spawn_download_increment(state.datasets.clone(), dataset_id);

    tracing::info!(
        dataset_id,
        %kind,
        format = %export_format,
        rows = rows.len(),
        bytes = body.len(),
        "Dataset exported"
    );

    Ok(ExportedFile {
        filename: format::filename(&title, export_format.extension()),
        content_type: export_format.content_type(),
        body,
        kind,
        rows: rows.len(),
    })
}

/// Bump the download counter without holding up the response
fn spawn_download_increment(datasets: Arc<dyn DatasetStore>, dataset_id: i32) {
    tokio::spawn(async move {
        if let Err(e) = datasets.increment_downloads(dataset_id).await {
            tracing::warn!(dataset_id, "Failed to increment download counter: {}", e);
        }
    });
}
