//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, BackendClient, MerchantApi};
use crate::config::AdminConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    api: Arc<dyn MerchantApi>,
}

impl AppState {
    /// Create application state backed by the HTTP backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self, ApiError> {
        let api = Arc::new(BackendClient::new(&config.api)?);
        Ok(Self::with_api(config, api))
    }

    /// Create application state over any [`MerchantApi`] implementation.
    #[must_use]
    pub fn with_api(config: AdminConfig, api: Arc<dyn MerchantApi>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, api }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get the backend API.
    #[must_use]
    pub fn api(&self) -> &dyn MerchantApi {
        self.inner.api.as_ref()
    }
}
