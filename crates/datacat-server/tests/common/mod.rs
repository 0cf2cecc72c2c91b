//! Shared helpers for datacat server integration tests
//!
//! Everything runs in process: the catalog is an [`InMemoryCatalog`], REST
//! upstreams are `wiremock` servers, and database/FTP upstreams are fakes
//! that count how often their connections are closed.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use datacat_common::rows::RowSet;
use datacat_server::api::create_router;
use datacat_server::config::{CorsConfig, ExportConfig};
use datacat_server::db::InMemoryCatalog;
use datacat_server::features::export::connectors::database::{DbEngine, SqlConnection};
use datacat_server::features::export::connectors::ftp::{FtpConfig, FtpSession};
use datacat_server::features::export::connectors::{FtpDialer, FtpError, SqlConnector};
use datacat_server::features::export::Connectors;
use datacat_server::features::FeatureState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub fn export_config() -> ExportConfig {
    ExportConfig {
        timeout_secs: 5,
        rest_max_retries: 0,
        rest_retry_delay_ms: 10,
        api_key: None,
    }
}

/// Build the full application router over an in-memory catalog
pub fn app(catalog: Arc<InMemoryCatalog>, connectors: Connectors) -> Router {
    let state = FeatureState {
        datasets: catalog.clone(),
        access_info: catalog,
        connectors,
        export_timeout: Duration::from_secs(5),
    };
    let cors = CorsConfig {
        allowed_origins: vec!["*".to_string()],
        allow_credentials: false,
    };
    create_router(state, &cors)
}

pub fn connectors() -> Connectors {
    Connectors::new(&export_config()).expect("connectors")
}

/// Send a GET request and collect status, headers and body
pub async fn get(app: Router, uri: &str) -> (StatusCode, Response<()>, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    (parts.status, Response::from_parts(parts, ()), bytes.to_vec())
}

/// Wait until the detached counter task has caught up
pub async fn wait_for_downloads(catalog: &InMemoryCatalog, id: i32, expected: i32) {
    for _ in 0..200 {
        if catalog.downloads(id) == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "downloads for dataset {} stayed at {:?}, expected {}",
        id,
        catalog.downloads(id),
        expected
    );
}

// ============================================================================
// Database fake
// ============================================================================

/// SQL connector returning fixed rows or failing every query
#[derive(Clone)]
pub struct CountingSqlConnector {
    rows: Option<RowSet>,
    closes: Arc<AtomicUsize>,
}

impl CountingSqlConnector {
    pub fn returning(rows: RowSet) -> Self {
        Self {
            rows: Some(rows),
            closes: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            rows: None,
            closes: Arc::default(),
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct CountingConnection {
    rows: Option<RowSet>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl SqlConnector for CountingSqlConnector {
    async fn connect(
        &self,
        _engine: DbEngine,
        _connection_string: &str,
    ) -> Result<Box<dyn SqlConnection>, sqlx::Error> {
        Ok(Box::new(CountingConnection {
            rows: self.rows.clone(),
            closes: self.closes.clone(),
        }))
    }
}

#[async_trait]
impl SqlConnection for CountingConnection {
    async fn fetch_rows(&mut self, _sql: &str) -> Result<RowSet, sqlx::Error> {
        self.rows
            .clone()
            .ok_or_else(|| sqlx::Error::Protocol("syntax error at or near \"SELEC\"".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// FTP fake
// ============================================================================

/// FTP dialer serving files from memory
#[derive(Clone, Default)]
pub struct MemoryFtp {
    files: HashMap<String, Vec<u8>>,
    closes: Arc<AtomicUsize>,
}

impl MemoryFtp {
    pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.to_string(), data.into());
        self
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct MemorySession(MemoryFtp);

impl FtpDialer for MemoryFtp {
    fn open(&self, _config: &FtpConfig, _timeout: Duration) -> Result<Box<dyn FtpSession>, FtpError> {
        Ok(Box::new(MemorySession(self.clone())))
    }
}

impl FtpSession for MemorySession {
    fn list(&mut self, _path: &str) -> Result<Vec<String>, FtpError> {
        Ok(self.0.files.keys().cloned().collect())
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, FtpError> {
        self.0
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| FtpError::Transfer(format!("550 {}: not found", path)))
    }

    fn quit(self: Box<Self>) -> Result<(), FtpError> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Catalog entry for an FTP dataset at `/pub/<filename>`
pub fn ftp_dataset(catalog: InMemoryCatalog, id: i32, title: &str, filename: &str) -> InMemoryCatalog {
    catalog
        .with_dataset(id, title, "FTP")
        .with_access_info(id, "ftp_protocol", "ftp")
        .with_access_info(id, "ftp_host", "ftp.example.com")
        .with_access_info(id, "ftp_filename", filename)
        .with_access_info(id, "ftp_username", "anonymous")
        .with_access_info(id, "ftp_password", "guest")
        .with_access_info(id, "ftp_path", "/pub")
}
