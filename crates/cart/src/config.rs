//! Cart service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_DATABASE_URL` - `PostgreSQL` connection string
//! - `CATALOG_SERVICE_URL` - Base URL of the product catalog service
//! - `IDENTITY_SERVICE_URL` - Base URL of the identity verification service
//!
//! ## Optional
//! - `CART_HOST` - Bind address (default: 127.0.0.1)
//! - `CART_PORT` - Listen port (default: 3000)
//! - `UPSTREAM_TIMEOUT_SECS` - Catalog/identity request timeout (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart service configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the product catalog service
    pub catalog_url: Url,
    /// Base URL of the identity verification service
    pub identity_url: Url,
    /// Request timeout for catalog and identity calls
    pub upstream_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(required_var("CART_DATABASE_URL")?);
        let catalog_url = url_var("CATALOG_SERVICE_URL")?;
        let identity_url = url_var("IDENTITY_SERVICE_URL")?;

        let host = optional_var("CART_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CART_HOST".to_owned(), e.to_string()))?;

        let port = optional_var("CART_PORT")
            .unwrap_or_else(|| "3000".to_owned())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CART_PORT".to_owned(), e.to_string()))?;

        let timeout_secs = optional_var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|| "5".to_owned())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("UPSTREAM_TIMEOUT_SECS".to_owned(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            catalog_url,
            identity_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: optional_var("SENTRY_DSN"),
        })
    }

    /// The socket address to bind the server to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn url_var(name: &str) -> Result<Url, ConfigError> {
    let raw = required_var(name)?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(name.to_owned(), e.to_string()))
}
