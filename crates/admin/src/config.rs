//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KAWN_API_URL` - Base URL of the backend REST API
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `KAWN_API_TIMEOUT_SECS` - Backend request timeout (default: 15)
//! - `IMPORT_BATCH_SIZE` - Concurrent backend calls per import batch (default: 5)
//! - `IMPORT_MAX_BYTES` - Largest accepted upload (default: 10 MiB)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default concurrent backend calls per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default upload limit: 10 MiB.
const DEFAULT_MAX_BYTES: &str = "10485760";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Backend REST API configuration
    pub api: BackendApiConfig,
    /// Bulk import limits
    pub import: ImportConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. `production`)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Backend REST API configuration.
///
/// Merchant requests authenticate with the merchant's own bearer token, so
/// there is no service key here.
#[derive(Debug, Clone)]
pub struct BackendApiConfig {
    /// Base URL, e.g. `https://api.kawn.com/v1/`
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Bulk import limits.
#[derive(Debug, Clone, Copy)]
pub struct ImportConfig {
    /// Rows sent to the backend concurrently
    pub batch_size: usize,
    /// Largest accepted spreadsheet upload
    pub max_bytes: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AdminConfig {
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

        Ok(Self {
            host: parse_env_or_default("ADMIN_HOST", "127.0.0.1")?,
            port: parse_env_or_default("ADMIN_PORT", "3001")?,
            api: BackendApiConfig::from_env()?,
            import: ImportConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BackendApiConfig {
    /// Load backend settings (`KAWN_API_URL`, `KAWN_API_TIMEOUT_SECS`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let raw_url = get_required_env("KAWN_API_URL")?;
        Ok(Self {
            base_url: parse_base_url("KAWN_API_URL", &raw_url)?,
            timeout: Duration::from_secs(parse_env_or_default("KAWN_API_TIMEOUT_SECS", "15")?),
        })
    }
}

impl ImportConfig {
    /// Load import limits.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for non-numeric or zero values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let batch_size: usize = parse_env_or_default("IMPORT_BATCH_SIZE", "5")?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "IMPORT_BATCH_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let max_bytes: usize = parse_env_or_default("IMPORT_MAX_BYTES", DEFAULT_MAX_BYTES)?;
        if max_bytes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "IMPORT_MAX_BYTES".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            batch_size,
            max_bytes,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a base URL, making sure it ends with `/` so `Url::join` appends.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url =
        Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_import_config_default() {
        let config = ImportConfig::default();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_bytes.to_string(), DEFAULT_MAX_BYTES);
    }

    #[test]
    fn test_parse_base_url() {
        let url = parse_base_url("X", "http://localhost:8080/api").unwrap();
        assert_eq!(
            url.join("categories").unwrap().as_str(),
            "http://localhost:8080/api/categories"
        );
        assert!(parse_base_url("X", "mailto:ops@kawn.com").is_err());
    }
}
