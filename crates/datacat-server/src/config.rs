//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default catalog database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/datacat";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Export Configuration Constants
// ============================================================================

/// Overall deadline for one export (connect + fetch + parse).
pub const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 30;

/// Retries for transient REST upstream failures.
pub const DEFAULT_REST_MAX_RETRIES: u32 = 2;

/// Base delay between REST retries, multiplied by the attempt number.
pub const DEFAULT_REST_RETRY_DELAY_MS: u64 = 500;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub export: ExportConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Catalog database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Export pipeline configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub timeout_secs: u64,
    pub rest_max_retries: u32,
    pub rest_retry_delay_ms: u64,
    /// Bearer token sent to REST upstreams
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl ExportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rest_retry_delay(&self) -> Duration {
        Duration::from_millis(self.rest_retry_delay_ms)
    }
}

impl std::fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportConfig")
            .field("timeout_secs", &self.timeout_secs)
            .field("rest_max_retries", &self.rest_max_retries)
            .field("rest_retry_delay_ms", &self.rest_retry_delay_ms)
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .finish()
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_EXPORT_TIMEOUT_SECS,
            rest_max_retries: DEFAULT_REST_MAX_RETRIES,
            rest_retry_delay_ms: DEFAULT_REST_RETRY_DELAY_MS,
            api_key: None,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from `.env`, environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("DATACAT_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("DATACAT_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "DATACAT_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            export: ExportConfig {
                timeout_secs: env_or("EXPORT_TIMEOUT_SECS", DEFAULT_EXPORT_TIMEOUT_SECS),
                rest_max_retries: env_or("EXPORT_REST_MAX_RETRIES", DEFAULT_REST_MAX_RETRIES),
                rest_retry_delay_ms: env_or(
                    "EXPORT_REST_RETRY_DELAY_MS",
                    DEFAULT_REST_RETRY_DELAY_MS,
                ),
                api_key: std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.export.timeout_secs == 0 {
            anyhow::bail!("Export timeout must be greater than 0");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            export: ExportConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.export.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_min_connections_above_max_rejected() {
        let mut config = Config::default();
        config.database.min_connections = 50;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }

    #[test]
    fn test_zero_export_timeout_rejected() {
        let mut config = Config::default();
        config.export.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_masked_in_debug() {
        let export = ExportConfig {
            api_key: Some("super-secret".to_string()),
            ..ExportConfig::default()
        };
        let printed = format!("{:?}", export);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("********"));
    }
}
