//! Tenant resolution check.
//!
//! Resolves a host the same way the storefront does, using the
//! `KAWN_BASE_DOMAINS`, `KAWN_DEFAULT_TENANT` and alias variables.
//!
//! ```bash
//! kawn tenant resolve shop1.kawn.com
//! ```

use kawn_core::TenantResolver;
use kawn_storefront::config::{ConfigError, TenantConfig};
use serde::Serialize;

/// What the storefront would do with a host.
#[derive(Debug, Serialize)]
pub struct Resolution {
    pub host: String,
    pub domain: String,
    /// Subdomain found in the host, after alias mapping.
    pub subdomain: Option<String>,
    /// Tenant whose store is served.
    pub tenant: String,
    pub is_default: bool,
}

/// Resolve `host` with the configured tenant settings.
///
/// # Errors
///
/// Returns an error if the tenant variables are malformed.
pub fn resolve(host: &str) -> Result<Resolution, ConfigError> {
    let _ = dotenvy::dotenv();
    let resolver = TenantConfig::from_env()?.resolver();
    Ok(resolve_with(&resolver, host))
}

fn resolve_with(resolver: &TenantResolver, host: &str) -> Resolution {
    let context = resolver.resolve(host);
    let tenant = context.subdomain_or(resolver.default_subdomain()).clone();

    Resolution {
        host: host.to_string(),
        subdomain: context.subdomain.as_ref().map(ToString::to_string),
        is_default: resolver.is_default_tenant(&tenant),
        tenant: tenant.to_string(),
        domain: context.domain,
    }
}
