//! Backend connectors
//!
//! Each connector turns its typed config into a [`RowSet`] before a shared
//! deadline. [`Connectors`] bundles one of each and dispatches on
//! [`ConnectorConfig`].

pub mod database;
pub mod ftp;
pub mod rest;

use super::resolver::ConnectorConfig;
use crate::config::ExportConfig;
use datacat_common::rows::RowSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

pub use database::{DatabaseConnector, DatabaseError, SqlConnector, SqlxConnector};
pub use ftp::{FtpConnector, FtpDialer, FtpError, SuppaFtpDialer};
pub use rest::{RestConnector, RestError};

/// Failure of any connector
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Ftp(#[from] FtpError),
}

/// One connector per backend kind
#[derive(Clone)]
pub struct Connectors {
    pub rest: RestConnector,
    pub database: DatabaseConnector,
    pub ftp: FtpConnector,
}

impl Connectors {
    /// Production connectors
    pub fn new(config: &ExportConfig) -> Result<Self, RestError> {
        Ok(Self {
            rest: RestConnector::new(config)?,
            database: DatabaseConnector::new(Arc::new(SqlxConnector)),
            ftp: FtpConnector::new(Arc::new(SuppaFtpDialer)),
        })
    }

    /// Swap the database backend
    pub fn with_sql_connector(mut self, connector: Arc<dyn SqlConnector>) -> Self {
        self.database = DatabaseConnector::new(connector);
        self
    }

    /// Swap the FTP backend
    pub fn with_ftp_dialer(mut self, dialer: Arc<dyn FtpDialer>) -> Self {
        self.ftp = FtpConnector::new(dialer);
        self
    }

    pub async fn fetch(
        &self,
        config: &ConnectorConfig,
        deadline: Instant,
    ) -> Result<RowSet, ConnectorError> {
        let rows = match config {
            ConnectorConfig::Rest(rest) => self.rest.fetch(rest, deadline).await?,
            ConnectorConfig::Database(database) => self.database.fetch(database, deadline).await?,
            ConnectorConfig::Ftp(ftp) => self.ftp.fetch(ftp, deadline).await?,
        };
        Ok(rows)
    }
}
