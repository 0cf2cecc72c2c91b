pub mod response;

use crate::config::{Config, CorsConfig};
use crate::db::{self, PgCatalogStore};
use crate::error::{ApiResult, AppError};
use crate::features::{self, export::Connectors, FeatureState};
use crate::middleware;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

/// Connect the catalog, build the router and serve until shutdown
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let catalog = Arc::new(PgCatalogStore::new(pool));
    let connectors = Connectors::new(&config.export)?;
    info!(
        timeout_secs = config.export.timeout_secs,
        rest_max_retries = config.export.rest_max_retries,
        upstream_bearer = config.export.api_key.is_some(),
        "Export connectors initialized"
    );

    let state = FeatureState {
        datasets: catalog.clone(),
        access_info: catalog,
        connectors,
        export_timeout: config.export.timeout(),
    };

    let app = create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Create the application router with all routes and middleware
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone());

    Router::new()
        .merge(health_routes)
        .merge(features::router(state))
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

/// Health check handler
async fn health_check(State(state): State<FeatureState>) -> ApiResult<Response> {
    state.datasets.ping().await.map_err(|e| {
        tracing::error!("Database health check failed: {:?}", e);
        AppError::Unavailable("Catalog database unreachable".to_string())
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "database": "connected",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give in-flight exports time to finish
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
