//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (session store)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `KAWN_API_URL` - Base URL of the backend REST API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `KAWN_API_KEY` - Service key sent to the backend as `X-Api-Key`
//! - `KAWN_API_TIMEOUT_SECS` - Backend request timeout (default: 15)
//! - `KAWN_BASE_DOMAINS` - Comma-separated store base domains (default: kawn.com)
//! - `KAWN_DEFAULT_TENANT` - Tenant used on bare hosts (default: main)
//! - `KAWN_TENANT_ALIASES` - Legacy subdomain mapping, `old=new,old2=new2`
//! - `KAWN_DEFAULT_TENANT_ALIASES` - Other names of the default tenant, comma-separated
//! - `SITE_CONFIG_CACHE_SECS` - Site config cache TTL in seconds (default: 0, no caching)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use kawn_core::TenantResolver;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Backend REST API configuration
    pub api: BackendApiConfig,
    /// Hostname to tenant mapping
    pub tenants: TenantConfig,
    /// How long site configuration responses are cached
    pub site_config_ttl: Duration,
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
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub struct BackendApiConfig {
    /// Base URL, e.g. `https://api.kawn.com/v1/`
    pub base_url: Url,
    /// Optional service key
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Tenant resolution settings.
#[derive(Debug, Clone)]
pub struct TenantConfig {
    /// Domains stores are served under, e.g. `kawn.com`
    pub base_domains: Vec<String>,
    /// Tenant used when the host has no subdomain
    pub default_tenant: String,
    /// Legacy subdomain to canonical subdomain
    pub aliases: HashMap<String, String>,
    /// Other names of the default tenant
    pub default_aliases: Vec<String>,
}

impl TenantConfig {
    /// Build the resolver described by this configuration.
    #[must_use]
    pub fn resolver(&self) -> TenantResolver {
        let resolver = TenantResolver::new(&self.base_domains, &self.default_tenant);
        let resolver = self
            .aliases
            .iter()
            .fold(resolver, |r, (legacy, canonical)| {
                r.with_alias(legacy, canonical)
            });
        self.default_aliases
            .iter()
            .fold(resolver, |r, alias| r.with_default_alias(alias))
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            base_domains: vec!["kawn.com".to_string()],
            default_tenant: "main".to_string(),
            aliases: HashMap::new(),
            default_aliases: Vec::new(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let api = BackendApiConfig::from_env()?;
        let tenants = TenantConfig::from_env()?;
        let site_config_ttl =
            Duration::from_secs(parse_env_or_default("SITE_CONFIG_CACHE_SECS", "0")?);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            api,
            tenants,
            site_config_ttl,
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

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Session database URL alone, for tools that only need the database.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if neither
    /// `STOREFRONT_DATABASE_URL` nor `DATABASE_URL` is set.
    pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
        let _ = dotenvy::dotenv();
        get_database_url("STOREFRONT_DATABASE_URL")
    }
}

impl BackendApiConfig {
    /// Load backend settings (`KAWN_API_URL`, `KAWN_API_KEY`, `KAWN_API_TIMEOUT_SECS`).
    ///
    /// The admin service reads the same variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or malformed or the key is weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("KAWN_API_URL")?;
        Ok(Self {
            base_url: parse_base_url("KAWN_API_URL", &raw_url)?,
            api_key: get_optional_env("KAWN_API_KEY")
                .map(|key| {
                    validate_secret_strength(&key, "KAWN_API_KEY")?;
                    Ok::<_, ConfigError>(SecretString::from(key))
                })
                .transpose()?,
            timeout: Duration::from_secs(parse_env_or_default("KAWN_API_TIMEOUT_SECS", "15")?),
        })
    }
}

impl TenantConfig {
    /// Load tenant settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for a malformed alias list.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_domains = parse_list(&get_env_or_default("KAWN_BASE_DOMAINS", "kawn.com"));
        if base_domains.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "KAWN_BASE_DOMAINS".to_string(),
                "at least one base domain is required".to_string(),
            ));
        }
        Ok(Self {
            base_domains,
            default_tenant: get_env_or_default("KAWN_DEFAULT_TENANT", "main"),
            aliases: parse_pairs(
                "KAWN_TENANT_ALIASES",
                &get_env_or_default("KAWN_TENANT_ALIASES", ""),
            )?,
            default_aliases: parse_list(&get_env_or_default("KAWN_DEFAULT_TENANT_ALIASES", "")),
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

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a base URL, making sure it ends with `/` so `Url::join` appends.
pub(crate) fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
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

/// Split a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Parse `a=b,c=d` pairs.
fn parse_pairs(key: &str, raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    parse_list(raw)
        .into_iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(a, b)| (a.trim().to_string(), b.trim().to_string()))
                .filter(|(a, b)| !a.is_empty() && !b.is_empty())
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(key.to_string(), format!("expected old=new, got {pair}"))
                })
        })
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kawn_core::Subdomain;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-api-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("X", "https://api.kawn.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.kawn.com/v1/");
        assert_eq!(
            url.join("customers/login").unwrap().as_str(),
            "https://api.kawn.com/v1/customers/login"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("X", "ftp://api.kawn.com").is_err());
        assert!(parse_base_url("X", "not a url").is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" Kawn.com, ,kawn.sa "), vec!["kawn.com", "kawn.sa"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs("X", "oldshop=newshop, legacy = main").unwrap();
        assert_eq!(pairs.get("oldshop").unwrap(), "newshop");
        assert_eq!(pairs.get("legacy").unwrap(), "main");
        assert!(parse_pairs("X", "broken").is_err());
        assert!(parse_pairs("X", "a=").is_err());
    }

    #[test]
    fn test_tenant_config_resolver() {
        let config = TenantConfig {
            aliases: HashMap::from([("oldshop".to_string(), "newshop".to_string())]),
            default_aliases: vec!["kawn".to_string()],
            ..TenantConfig::default()
        };
        let resolver = config.resolver();
        let ctx = resolver.resolve("oldshop.kawn.com");
        assert_eq!(ctx.subdomain.unwrap().as_str(), "newshop");
        assert!(resolver.is_default_tenant(&Subdomain::parse("kawn").unwrap()));
    }

    #[test]
    fn test_backend_config_debug_redacts_key() {
        let config = BackendApiConfig {
            base_url: Url::parse("https://api.kawn.com/").unwrap(),
            api_key: Some(SecretString::from("super_secret_service_key")),
            timeout: Duration::from_secs(15),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.kawn.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_service_key"));
    }
}
