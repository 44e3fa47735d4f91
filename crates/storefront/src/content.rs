//! Site content loading: per-store configuration and pages.
//!
//! Every request fetches site configuration and pages from the backend, so a
//! merchant's edits show up on the next navigation. A per-subdomain config
//! cache can be switched on with a non-zero TTL.

use std::sync::Arc;
use std::time::Duration;

use kawn_core::{Page, Slug, Subdomain, pages};
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::api::{ApiError, CustomerApi, SiteConfig};

/// Maximum number of stores whose configuration is cached.
const MAX_CACHED_CONFIGS: u64 = 10_000;

/// Site config cache TTL when none is configured. Zero means no caching.
pub const DEFAULT_SITE_CONFIG_TTL: Duration = Duration::ZERO;

/// Errors from loading site content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// No page with this slug, and it is not a system page.
    #[error("page not found: {0}")]
    NotFound(String),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] ApiError),
}

/// Loads site configuration and pages for a tenant.
#[derive(Clone)]
pub struct SiteContentLoader {
    api: Arc<dyn CustomerApi>,
    configs: Option<Cache<Subdomain, SiteConfig>>,
}

impl SiteContentLoader {
    /// Create a loader. A zero `ttl` disables the site config cache.
    #[must_use]
    pub fn new(api: Arc<dyn CustomerApi>, ttl: Duration) -> Self {
        let configs = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHED_CONFIGS)
                .time_to_live(ttl)
                .build()
        });
        Self { api, configs }
    }

    /// Site configuration for a store.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Backend` if the backend call fails. Failures
    /// are not cached.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn site_config(&self, tenant: &Subdomain) -> Result<SiteConfig, ContentError> {
        if let Some(cache) = &self.configs
            && let Some(config) = cache.get(tenant).await
        {
            debug!("Site config cache hit");
            return Ok(config);
        }

        let config = self.api.site_config(tenant).await?;
        if let Some(cache) = &self.configs {
            cache.insert(tenant.clone(), config.clone()).await;
        }
        Ok(config)
    }

    /// Load a page by slug, synthesising system pages that have no record.
    ///
    /// Unpublished records are treated as missing.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` for unknown non-system slugs and
    /// `ContentError::Backend` if the backend call fails.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn load_page(&self, tenant: &Subdomain, slug: &str) -> Result<Page, ContentError> {
        let slug = Slug::parse(slug).map_err(|_| ContentError::NotFound(slug.to_string()))?;

        let persisted = self
            .api
            .page_by_slug(tenant, slug.as_str())
            .await?
            .filter(|page| page.is_published);
        if let Some(page) = persisted {
            return Ok(page);
        }

        if !pages::is_system_slug(slug.as_str()) {
            return Err(ContentError::NotFound(slug.as_str().to_string()));
        }

        let config = match self.site_config(tenant).await {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "Site config unavailable, using default virtual page");
                None
            }
        };
        let (store_type, language) = config
            .map(|c| (c.store_type, c.language))
            .unwrap_or_default();

        debug!(slug = %slug, "Serving virtual page");
        pages::virtual_page(slug.as_str(), store_type, language)
            .ok_or_else(|| ContentError::NotFound(slug.as_str().to_string()))
    }
}
