//! Application state shared across handlers.

use std::sync::Arc;

use kawn_core::TenantResolver;
use sqlx::PgPool;

use crate::api::{ApiError, BackendClient, CustomerApi};
use crate::config::StorefrontConfig;
use crate::content::SiteContentLoader;
use crate::services::LoginEvents;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    api: Arc<dyn CustomerApi>,
    resolver: TenantResolver,
    content: SiteContentLoader,
    login_events: LoginEvents,
}

impl AppState {
    /// Create application state backed by the HTTP backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, ApiError> {
        let api = Arc::new(BackendClient::new(&config.api)?);
        Ok(Self::with_api(config, pool, api))
    }

    /// Create application state over any [`CustomerApi`] implementation.
    #[must_use]
    pub fn with_api(config: StorefrontConfig, pool: PgPool, api: Arc<dyn CustomerApi>) -> Self {
        let resolver = config.tenants.resolver();
        let content = SiteContentLoader::new(Arc::clone(&api), config.site_config_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                api,
                resolver,
                content,
                login_events: LoginEvents::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the backend API.
    #[must_use]
    pub fn api(&self) -> &dyn CustomerApi {
        self.inner.api.as_ref()
    }

    /// Get the tenant resolver.
    #[must_use]
    pub fn resolver(&self) -> &TenantResolver {
        &self.inner.resolver
    }

    /// Get the site content loader.
    #[must_use]
    pub fn content(&self) -> &SiteContentLoader {
        &self.inner.content
    }

    /// Get the login event channel.
    #[must_use]
    pub fn login_events(&self) -> &LoginEvents {
        &self.inner.login_events
    }
}
