//! Client for the Kawn backend REST API (merchant endpoints).
//!
//! Merchant calls authenticate with the merchant's bearer token; the backend
//! derives the store from it, so no tenant header is sent.

mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use async_trait::async_trait;
use kawn_core::{CategoryId, Page, ProductId};
use thiserror::Error;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend rejected the request with a client error.
    #[error("Rejected ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the backend.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Merchant token was not accepted.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend failed (5xx).
    #[error("Backend error ({status}): {message}")]
    Server {
        /// HTTP status returned by the backend.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },
}

impl ApiError {
    /// Whether the backend refused the request rather than failing.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::Unauthorized(_) | Self::NotFound(_)
        )
    }

    /// Message safe to show to the merchant, e.g. in an import report.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } | Self::NotFound(message) => message.clone(),
            Self::Unauthorized(_) => "Not authorized".to_string(),
            Self::RateLimited(_) => "Too many requests, try again shortly".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Server { .. } => {
                "External service error".to_string()
            }
        }
    }
}

/// Merchant-facing backend operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MerchantApi: Send + Sync {
    /// `GET /categories`
    async fn list_categories(&self, token: &MerchantToken) -> Result<Vec<Category>, ApiError>;

    /// `POST /categories`
    async fn create_category(
        &self,
        token: &MerchantToken,
        input: &CategoryInput,
    ) -> Result<Category, ApiError>;

    /// `PUT /categories/{id}`
    async fn update_category(
        &self,
        token: &MerchantToken,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, ApiError>;

    /// `DELETE /categories/{id}`
    async fn delete_category(&self, token: &MerchantToken, id: CategoryId)
    -> Result<(), ApiError>;

    /// `GET /products`
    async fn list_products(&self, token: &MerchantToken) -> Result<Vec<Product>, ApiError>;

    /// `POST /products`
    async fn create_product(
        &self,
        token: &MerchantToken,
        input: &ProductInput,
    ) -> Result<Product, ApiError>;

    /// `PUT /products/{id}`
    async fn update_product(
        &self,
        token: &MerchantToken,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError>;

    /// `DELETE /products/{id}`
    async fn delete_product(&self, token: &MerchantToken, id: ProductId) -> Result<(), ApiError>;

    /// `GET /brands`
    async fn list_brands(&self, token: &MerchantToken) -> Result<Vec<Brand>, ApiError>;

    /// `GET /site-config`, reduced to what page synthesis needs.
    async fn store_settings(&self, token: &MerchantToken) -> Result<StoreSettings, ApiError>;

    /// `GET /pages/slug/{slug}`. `Ok(None)` when the page does not exist.
    async fn page_by_slug(
        &self,
        token: &MerchantToken,
        slug: &str,
    ) -> Result<Option<Page>, ApiError>;

    /// `POST /pages`
    async fn create_page(&self, token: &MerchantToken, page: &NewPage) -> Result<Page, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_message_hides_server_details() {
        let server = ApiError::Server {
            status: 500,
            message: "duplicate key value violates unique constraint".to_string(),
        };
        assert!(!server.is_client_error());
        assert_eq!(server.public_message(), "External service error");

        let rejected = ApiError::Rejected {
            status: 422,
            message: "SKU already taken".to_string(),
        };
        assert!(rejected.is_client_error());
        assert_eq!(rejected.public_message(), "SKU already taken");
    }
}
