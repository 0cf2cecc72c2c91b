//! REST API connector
//!
//! Two ways to describe the endpoint:
//!
//! - `api_url`: used verbatim.
//! - `url` + optional `key` + extra fields: the key fills the first query
//!   parameter that has an empty value (or is appended as `apiKey`), then
//!   every other field is appended as a query parameter in field order.

use crate::config::ExportConfig;
use crate::features::export::params::AccessParams;
use crate::features::export::resolver::ConfigurationError;
use datacat_common::rows::RowSet;
use datacat_common::CommonError;
use reqwest::{header, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

/// Fields consumed by templated mode and never forwarded as query parameters
const TEMPLATE_FIELDS: &[&str] = &["url", "key", "api_url"];

/// Query parameter used when the URL has no empty slot for the key
pub const API_KEY_PARAM: &str = "apiKey";

/// Resolved REST endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct RestConfig {
    pub url: Url,
}

impl RestConfig {
    pub fn from_params(params: &AccessParams) -> Result<Self, ConfigurationError> {
        if let Some(api_url) = params.get_non_empty("api_url") {
            let url = Url::parse(api_url.trim())
                .map_err(|e| ConfigurationError::new(format!("Invalid api_url: {}", e)))?;
            return Ok(Self { url });
        }

        let base = params
            .get_non_empty("url")
            .ok_or_else(|| ConfigurationError::missing("REST", &["api_url or url"]))?;
        let mut url = Url::parse(base.trim())
            .map_err(|e| ConfigurationError::new(format!("Invalid url: {}", e)))?;

        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        if let Some(key) = params.get_non_empty("key") {
            match pairs.iter_mut().find(|(_, value)| value.is_empty()) {
                Some(slot) => slot.1 = key.to_string(),
                None => pairs.push((API_KEY_PARAM.to_string(), key.to_string())),
            }
        }

        pairs.extend(
            params
                .iter()
                .filter(|(field, _)| !TEMPLATE_FIELDS.contains(field))
                .map(|(field, value)| (field.to_string(), value.to_string())),
        );

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs.iter());
        }

        Ok(Self { url })
    }

    /// Host for log fields; the query may carry credentials
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("<no host>")
    }
}

impl fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestConfig")
            .field("host", &self.host())
            .field("path", &self.url.path())
            .finish_non_exhaustive()
    }
}

/// REST fetch errors
#[derive(Error, Debug)]
pub enum RestError {
    #[error("REST request failed: {0}")]
    Request(reqwest::Error),

    #[error("REST upstream answered {0}")]
    Status(StatusCode),

    #[error("REST upstream returned invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("REST upstream returned unusable data: {0}")]
    Shape(CommonError),

    #[error("REST export deadline exceeded")]
    DeadlineExceeded,
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest errors carry the full URL, including any api key
        Self::Request(err.without_url())
    }
}

impl RestError {
    /// Worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            RestError::Request(e) => e.is_connect() || e.is_timeout(),
            RestError::Status(status) => status.is_server_error(),
            _ => false,
        }
    }
}

/// HTTP client for REST datasets
#[derive(Clone)]
pub struct RestConnector {
    client: reqwest::Client,
    bearer: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl RestConnector {
    pub fn new(config: &ExportConfig) -> Result<Self, RestError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("datacat-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            bearer: config.api_key.clone(),
            max_retries: config.rest_max_retries,
            retry_delay: config.rest_retry_delay(),
        })
    }

    /// Fetch the endpoint and normalize the JSON body into rows
    pub async fn fetch(&self, config: &RestConfig, deadline: Instant) -> Result<RowSet, RestError> {
        tokio::time::timeout_at(deadline, self.fetch_with_retry(config))
            .await
            .map_err(|_| RestError::DeadlineExceeded)?
    }

    async fn fetch_with_retry(&self, config: &RestConfig) -> Result<RowSet, RestError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(config).await {
                Ok(rows) => {
                    tracing::info!(host = config.host(), rows = rows.len(), "REST fetch complete");
                    return Ok(rows);
                },
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    tracing::warn!(
                        host = config.host(),
                        "REST attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, config: &RestConfig) -> Result<RowSet, RestError> {
        let mut request = self
            .client
            .get(config.url.clone())
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status(status));
        }

        let body = response.bytes().await?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(RestError::InvalidJson)?;
        RowSet::from_json(value).map_err(RestError::Shape)
    }
}
