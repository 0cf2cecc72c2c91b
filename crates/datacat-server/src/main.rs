//! Datacat Server - Main entry point

use anyhow::Result;
use datacat_common::logging::{init_logging, LogConfig};
use datacat_server::{api, config::Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::default()
        .with_file_prefix("datacat-server")
        .with_filter_directives("datacat_server=debug,tower_http=debug,sqlx=info")
        .with_env_overrides()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&log_config)?;

    info!("Starting datacat server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await
}
