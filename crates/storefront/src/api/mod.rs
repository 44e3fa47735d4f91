//! Client for the Kawn backend REST API (customer-facing endpoints).
//!
//! # Architecture
//!
//! - The backend is the source of truth for customers, pages and site
//!   configuration. The storefront keeps no copy of its data.
//! - Every request carries the tenant in the `X-Tenant-Subdomain` header.
//! - Handlers and services depend on the [`CustomerApi`] trait, so tests can
//!   swap the HTTP client for a mock or an in-process fake.
//!
//! # Example
//!
//! ```rust,ignore
//! use kawn_storefront::api::{BackendClient, CustomerApi};
//!
//! let client = BackendClient::new(&config.api)?;
//! let config = client.site_config(&tenant).await?;
//! ```

mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use async_trait::async_trait;
use kawn_core::{CustomerId, Email, OtpCode, Page, Subdomain};
use thiserror::Error;

use crate::models::SessionToken;

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

    /// Credentials or token were not accepted.
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

    /// A 2xx response did not have any of the expected shapes.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// Whether the backend refused the request because of its input or the
    /// caller's credentials, as opposed to failing.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::Unauthorized(_) | Self::NotFound(_)
        )
    }

    /// Message safe to show to the customer.
    #[must_use]
    pub fn public_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } | Self::Unauthorized(message) => Some(message),
            _ => None,
        }
    }
}

/// Customer-facing backend operations.
///
/// Every call is scoped to a tenant subdomain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerApi: Send + Sync {
    /// `POST /customers/login`
    async fn login(
        &self,
        tenant: &Subdomain,
        email: &Email,
        password: &str,
    ) -> Result<LoginStep, ApiError>;

    /// `POST /customers/login/two-factor`
    async fn verify_two_factor_login(
        &self,
        tenant: &Subdomain,
        customer_id: CustomerId,
        code: &OtpCode,
    ) -> Result<AuthSuccess, ApiError>;

    /// `POST /customers/signup`
    async fn signup(
        &self,
        tenant: &Subdomain,
        request: &SignupRequest,
    ) -> Result<SignupStep, ApiError>;

    /// `POST /customers/verify-email`
    async fn verify_email(
        &self,
        tenant: &Subdomain,
        email: &Email,
        code: &OtpCode,
    ) -> Result<AuthSuccess, ApiError>;

    /// `POST /customers/resend-verification-code`
    async fn resend_verification_code(
        &self,
        tenant: &Subdomain,
        email: &Email,
    ) -> Result<(), ApiError>;

    /// `POST /customers/two-factor/setup`
    async fn setup_two_factor(
        &self,
        tenant: &Subdomain,
        token: &SessionToken,
    ) -> Result<TwoFactorSetup, ApiError>;

    /// `POST /customers/two-factor/enable`, returning recovery codes.
    async fn enable_two_factor(
        &self,
        tenant: &Subdomain,
        token: &SessionToken,
        code: &OtpCode,
    ) -> Result<Vec<String>, ApiError>;

    /// `GET /site-config`
    async fn site_config(&self, tenant: &Subdomain) -> Result<SiteConfig, ApiError>;

    /// `GET /pages/slug/{slug}`. `Ok(None)` when the page does not exist.
    async fn page_by_slug(&self, tenant: &Subdomain, slug: &str) -> Result<Option<Page>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        let rejected = ApiError::Rejected {
            status: 422,
            message: "Email already registered".to_string(),
        };
        assert!(rejected.is_client_error());
        assert_eq!(rejected.public_message(), Some("Email already registered"));

        let server = ApiError::Server {
            status: 500,
            message: "stack trace".to_string(),
        };
        assert!(!server.is_client_error());
        assert_eq!(server.public_message(), None);
    }
}
