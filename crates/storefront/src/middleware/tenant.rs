//! Tenant extractor.
//!
//! Resolves the store from `X-Forwarded-Host` (set by the edge proxy) or
//! `Host`, falling back to the default tenant.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use kawn_core::{Subdomain, TenantContext, TenantResolver};

use crate::state::AppState;

const FORWARDED_HOST: &str = "x-forwarded-host";

/// The store a request is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    /// What the host resolved to.
    pub context: TenantContext,
    /// Effective subdomain: the resolved one or the default tenant.
    pub subdomain: Subdomain,
}

impl Tenant {
    /// Resolve from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, resolver: &TenantResolver) -> Self {
        let host = request_host(headers).unwrap_or_default();
        let context = resolver.resolve(host);
        let subdomain = context
            .subdomain_or(resolver.default_subdomain())
            .clone();
        Self { context, subdomain }
    }
}

/// The client-facing host: the first `X-Forwarded-Host` entry, else `Host`.
fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
}

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let tenant = Self::from_headers(&parts.headers, state.resolver());
        tracing::Span::current().record("tenant", tenant.subdomain.as_str());
        Ok(tenant)
    }
}
