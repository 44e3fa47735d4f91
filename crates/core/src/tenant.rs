//! Hostname to tenant resolution.
//!
//! Every merchant store is served from its own subdomain, e.g.
//! `shop1.kawn.com`. The resolver turns a request's `Host` value into a
//! [`TenantContext`]. It is a pure function of its configuration and the
//! host string: it never fails, it only reports "no tenant" when nothing
//! matches, and callers fall back to the default tenant.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::Serialize;

use crate::types::Subdomain;

/// Development suffix: `shop1.localhost` resolves to `shop1`.
const LOCALHOST: &str = "localhost";

/// Label that never names a tenant.
const WWW: &str = "www";

/// Default tenant when the configured one is not a valid label.
const FALLBACK_TENANT: &str = "main";

/// Header carrying the resolved tenant on every backend request.
pub const TENANT_HEADER: &str = "X-Tenant-Subdomain";

/// Tenant derived from a single request's hostname. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantContext {
    /// The store subdomain, if the host carried one.
    pub subdomain: Option<Subdomain>,
    /// The host without port, lowercased.
    pub domain: String,
}

impl TenantContext {
    /// The resolved subdomain, or `default` when the host had none.
    #[must_use]
    pub fn subdomain_or<'a>(&'a self, default: &'a Subdomain) -> &'a Subdomain {
        self.subdomain.as_ref().unwrap_or(default)
    }

    /// Whether this host is a local development host.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.domain == LOCALHOST || self.domain.parse::<IpAddr>().is_ok()
    }
}

/// Resolves tenants from hostnames.
///
/// # Example
///
/// ```
/// use kawn_core::TenantResolver;
///
/// let resolver = TenantResolver::new(["kawn.com"], "main");
/// let ctx = resolver.resolve("shop1.kawn.com");
/// assert_eq!(ctx.subdomain.unwrap().as_str(), "shop1");
///
/// assert!(resolver.resolve("localhost:8080").subdomain.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TenantResolver {
    base_domains: Vec<String>,
    aliases: HashMap<String, Subdomain>,
    default_subdomain: Subdomain,
    default_aliases: Vec<Subdomain>,
}

impl TenantResolver {
    /// Create a resolver for the given base domains.
    ///
    /// An invalid `default_subdomain` falls back to `main`.
    #[must_use]
    pub fn new<I, S>(base_domains: I, default_subdomain: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base_domains = base_domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        let default_subdomain = Subdomain::parse(default_subdomain)
            .unwrap_or_else(|_| Subdomain::new_unchecked(FALLBACK_TENANT));

        Self {
            base_domains,
            aliases: HashMap::new(),
            default_subdomain,
            default_aliases: Vec::new(),
        }
    }

    /// Map a legacy subdomain to its canonical name.
    ///
    /// Invalid labels on either side are ignored.
    #[must_use]
    pub fn with_alias(mut self, legacy: &str, canonical: &str) -> Self {
        if let (Ok(legacy), Ok(canonical)) = (Subdomain::parse(legacy), Subdomain::parse(canonical))
        {
            self.aliases.insert(legacy.as_str().to_owned(), canonical);
        }
        self
    }

    /// Mark a subdomain as another name for the default tenant.
    ///
    /// A customer of such a tenant is treated as belonging to the bare host
    /// when deciding whether to redirect after login.
    #[must_use]
    pub fn with_default_alias(mut self, alias: &str) -> Self {
        if let Ok(alias) = Subdomain::parse(alias) {
            self.default_aliases.push(alias);
        }
        self
    }

    /// The tenant used when the host carries no subdomain.
    #[must_use]
    pub const fn default_subdomain(&self) -> &Subdomain {
        &self.default_subdomain
    }

    /// Configured base domains, in priority order.
    #[must_use]
    pub fn base_domains(&self) -> &[String] {
        &self.base_domains
    }

    /// Whether `subdomain` is the default tenant or one of its aliases.
    #[must_use]
    pub fn is_default_tenant(&self, subdomain: &Subdomain) -> bool {
        *subdomain == self.default_subdomain || self.default_aliases.contains(subdomain)
    }

    /// Resolve a `Host` header value into a tenant context.
    #[must_use]
    pub fn resolve(&self, host: &str) -> TenantContext {
        let domain = strip_port(&host.trim().to_ascii_lowercase()).to_owned();

        let label = self.extract_label(&domain);
        let subdomain = label
            .and_then(|l| Subdomain::parse(l).ok())
            .map(|s| self.canonicalize(s));

        TenantContext { subdomain, domain }
    }

    /// Resolve a customer's stored tenant name through the alias table.
    #[must_use]
    pub fn canonicalize(&self, subdomain: Subdomain) -> Subdomain {
        self.aliases
            .get(subdomain.as_str())
            .cloned()
            .unwrap_or(subdomain)
    }

    /// Absolute URL of `path` on a tenant's storefront.
    ///
    /// Uses `http://<sub>.localhost` when `current` is a local
    /// development host, otherwise `https://<sub>.<first base domain>`.
    #[must_use]
    pub fn store_url(&self, subdomain: &Subdomain, path: &str, current: &TenantContext) -> String {
        let path = if path.starts_with('/') { path } else { "/" };
        if current.is_local() || self.base_domains.is_empty() {
            return format!("http://{subdomain}.{LOCALHOST}{path}");
        }
        let base = self
            .base_domains
            .iter()
            .find(|base| {
                current.domain == **base || current.domain.ends_with(&format!(".{base}"))
            })
            .or_else(|| self.base_domains.first())
            .map_or(LOCALHOST, String::as_str);
        format!("https://{subdomain}.{base}{path}")
    }

    fn extract_label<'a>(&self, domain: &'a str) -> Option<&'a str> {
        if domain.is_empty() || domain == LOCALHOST || domain.parse::<IpAddr>().is_ok() {
            return None;
        }

        if let Some(prefix) = domain.strip_suffix(".localhost") {
            return leftmost_tenant_label(prefix);
        }

        self.base_domains.iter().find_map(|base| {
            domain
                .strip_suffix(base.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
                .and_then(leftmost_tenant_label)
        })
    }
}

/// Leftmost label of a host prefix, unless it is empty or `www`.
fn leftmost_tenant_label(prefix: &str) -> Option<&str> {
    prefix
        .split('.')
        .next()
        .filter(|label| !label.is_empty() && *label != WWW)
}

/// Strip a `:port` suffix, handling bracketed IPv6 literals.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    // A bare IPv6 literal has several colons and no port.
    if host.matches(':').count() > 1 {
        return host;
    }
    host.split(':').next().unwrap_or(host)
}
