//! HTTP implementation of [`CustomerApi`].

use std::sync::Arc;

use async_trait::async_trait;
use kawn_core::{CustomerId, Email, OtpCode, Page, Subdomain, TENANT_HEADER};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::types::{RawAuthResponse, RecoveryCodesResponse};
use super::{
    ApiError, AuthSuccess, CustomerApi, LoginStep, SignupRequest, SignupStep, SiteConfig,
    TwoFactorSetup,
};
use crate::config::BackendApiConfig;
use crate::models::SessionToken;

/// Longest backend error body echoed into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Client for the Kawn backend REST API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("kawn-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                api_key: config
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret().to_string()),
            }),
        })
    }

    /// Start a request to `path` (relative to the base URL) for a tenant.
    fn request(
        &self,
        method: Method,
        path: &str,
        tenant: &Subdomain,
        token: Option<&SessionToken>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::UnexpectedResponse(format!("invalid path {path}: {e}")))?;

        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header(TENANT_HEADER, tenant.as_str());
        if let Some(key) = &self.inner.api_key {
            builder = builder.header("X-Api-Key", key);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose());
        }
        Ok(builder)
    }

    /// Send a request and decode a JSON body, mapping error statuses.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(builder.send().await?).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::from_str("null")?);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map a non-success response to an [`ApiError`].
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ApiError::RateLimited(retry_after));
    }

    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text);
    debug!(status = %status, message = %message, "Backend returned error");

    Err(match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        s if s.is_client_error() => ApiError::Rejected {
            status: s.as_u16(),
            message,
        },
        s => ApiError::Server {
            status: s.as_u16(),
            message,
        },
    })
}

/// Pull a human-readable message out of a backend error body.
///
/// Accepts `{"message": ...}` or `{"error": ...}`, falling back to the raw
/// text truncated to a sane length.
pub(crate) fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed.as_ref().and_then(|v| {
        ["message", "error"]
            .iter()
            .find_map(|key| v.get(key).and_then(serde_json::Value::as_str))
    });
    match field {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "no details".to_string(),
        None => body.trim().chars().take(MAX_ERROR_BODY).collect(),
    }
}

#[async_trait]
impl CustomerApi for BackendClient {
    #[instrument(skip(self, password), fields(tenant = %tenant))]
    async fn login(
        &self,
        tenant: &Subdomain,
        email: &Email,
        password: &str,
    ) -> Result<LoginStep, ApiError> {
        let request = self
            .request(Method::POST, "customers/login", tenant, None)?
            .json(&json!({ "email": email.as_str(), "password": password }));
        self.send::<RawAuthResponse>(request).await?.into_login_step()
    }

    #[instrument(skip(self, code), fields(tenant = %tenant))]
    async fn verify_two_factor_login(
        &self,
        tenant: &Subdomain,
        customer_id: CustomerId,
        code: &OtpCode,
    ) -> Result<AuthSuccess, ApiError> {
        let request = self
            .request(Method::POST, "customers/login/two-factor", tenant, None)?
            .json(&json!({ "customerId": customer_id, "code": code.as_str() }));
        self.send::<RawAuthResponse>(request)
            .await?
            .into_auth_success()
    }

    #[instrument(skip(self, request), fields(tenant = %tenant))]
    async fn signup(
        &self,
        tenant: &Subdomain,
        request: &SignupRequest,
    ) -> Result<SignupStep, ApiError> {
        let request = self
            .request(Method::POST, "customers/signup", tenant, None)?
            .json(request);
        self.send::<RawAuthResponse>(request).await?.into_signup_step()
    }

    #[instrument(skip(self, code), fields(tenant = %tenant))]
    async fn verify_email(
        &self,
        tenant: &Subdomain,
        email: &Email,
        code: &OtpCode,
    ) -> Result<AuthSuccess, ApiError> {
        let request = self
            .request(Method::POST, "customers/verify-email", tenant, None)?
            .json(&json!({ "email": email.as_str(), "code": code.as_str() }));
        self.send::<RawAuthResponse>(request)
            .await?
            .into_auth_success()
    }

    #[instrument(skip(self), fields(tenant = %tenant))]
    async fn resend_verification_code(
        &self,
        tenant: &Subdomain,
        email: &Email,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "customers/resend-verification-code", tenant, None)?
            .json(&json!({ "email": email.as_str() }));
        self.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(tenant = %tenant))]
    async fn setup_two_factor(
        &self,
        tenant: &Subdomain,
        token: &SessionToken,
    ) -> Result<TwoFactorSetup, ApiError> {
        let request = self.request(Method::POST, "customers/two-factor/setup", tenant, Some(token))?;
        self.send(request).await
    }

    #[instrument(skip(self, token, code), fields(tenant = %tenant))]
    async fn enable_two_factor(
        &self,
        tenant: &Subdomain,
        token: &SessionToken,
        code: &OtpCode,
    ) -> Result<Vec<String>, ApiError> {
        let request = self
            .request(Method::POST, "customers/two-factor/enable", tenant, Some(token))?
            .json(&json!({ "code": code.as_str() }));
        let response: Option<RecoveryCodesResponse> = self.send(request).await?;
        Ok(response.map(|r| r.recovery_codes).unwrap_or_default())
    }

    #[instrument(skip(self), fields(tenant = %tenant))]
    async fn site_config(&self, tenant: &Subdomain) -> Result<SiteConfig, ApiError> {
        let request = self.request(Method::GET, "site-config", tenant, None)?;
        self.send(request).await
    }

    #[instrument(skip(self), fields(tenant = %tenant))]
    async fn page_by_slug(&self, tenant: &Subdomain, slug: &str) -> Result<Option<Page>, ApiError> {
        let path = format!("pages/slug/{}", urlencoding::encode(slug));
        let request = self.request(Method::GET, &path, tenant, None)?;
        match self.send::<Option<Page>>(request).await {
            Ok(page) => Ok(page),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
