//! Connector selection
//!
//! Turns a dataset's [`AccessParams`] into a typed [`ConnectorConfig`].
//! The per-kind download routes name the connector themselves
//! ([`for_kind`]); the generic route infers it from the fields present
//! ([`resolve`]).

use super::connectors::{database::DatabaseConfig, ftp::FtpConfig, rest::RestConfig};
use super::params::AccessParams;
use datacat_common::types::ExportKind;
use thiserror::Error;

/// Access parameters cannot be turned into a connector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ConfigurationError(pub String);

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Error naming every missing field of a connector
    pub fn missing(connector: &str, fields: &[&str]) -> Self {
        Self(format!(
            "Missing {} access parameters: {}",
            connector,
            fields.join(", ")
        ))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Connection details for exactly one backend
#[derive(Debug, Clone)]
pub enum ConnectorConfig {
    Rest(RestConfig),
    Database(DatabaseConfig),
    Ftp(FtpConfig),
}

impl ConnectorConfig {
    pub fn kind(&self) -> ExportKind {
        match self {
            ConnectorConfig::Rest(_) => ExportKind::RestApi,
            ConnectorConfig::Database(_) => ExportKind::Database,
            ConnectorConfig::Ftp(_) => ExportKind::Ftp,
        }
    }
}

/// Infer the connector kind from the fields present
///
/// Database wins over FTP, FTP over REST.
pub fn detect_kind(params: &AccessParams) -> Option<ExportKind> {
    if params.contains("db_type") && params.contains("sql_query") {
        Some(ExportKind::Database)
    } else if params.contains("ftp_host") {
        Some(ExportKind::Ftp)
    } else if params.contains("api_url") || params.contains("url") {
        Some(ExportKind::RestApi)
    } else {
        None
    }
}

/// Build the connector config the parameters describe
pub fn resolve(params: &AccessParams) -> Result<ConnectorConfig, ConfigurationError> {
    ensure_configured(params)?;
    let kind = detect_kind(params).ok_or_else(|| {
        ConfigurationError::new("Access info does not describe a REST, database or FTP source")
    })?;
    for_kind(kind, params)
}

/// Build the connector config of a given kind
pub fn for_kind(
    kind: ExportKind,
    params: &AccessParams,
) -> Result<ConnectorConfig, ConfigurationError> {
    ensure_configured(params)?;
    match kind {
        ExportKind::RestApi => RestConfig::from_params(params).map(ConnectorConfig::Rest),
        ExportKind::Database => DatabaseConfig::from_params(params).map(ConnectorConfig::Database),
        ExportKind::Ftp => FtpConfig::from_params(params).map(ConnectorConfig::Ftp),
    }
}

fn ensure_configured(params: &AccessParams) -> Result<(), ConfigurationError> {
    if params.is_empty() {
        return Err(ConfigurationError::new("No access info configured for this dataset"));
    }
    Ok(())
}
