//! HTTP implementation of [`MerchantApi`].

use std::sync::Arc;

use async_trait::async_trait;
use kawn_core::{CategoryId, Page, ProductId};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::types::RawStoreSettings;
use super::{
    ApiError, Brand, Category, CategoryInput, MerchantApi, MerchantToken, NewPage, Product,
    ProductInput, StoreSettings,
};
use crate::config::BackendApiConfig;

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
            .user_agent(concat!("kawn-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: &MerchantToken,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path).map_err(|e| ApiError::Rejected {
            status: 400,
            message: format!("invalid path {path}: {e}"),
        })?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .bearer_auth(token.expose()))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(builder.send().await?).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::from_str("null")?);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request whose response body is ignored.
    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        check_status(builder.send().await?).await?;
        Ok(())
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
fn error_message(body: &str) -> String {
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
impl MerchantApi for BackendClient {
    #[instrument(skip_all)]
    async fn list_categories(&self, token: &MerchantToken) -> Result<Vec<Category>, ApiError> {
        let request = self.request(Method::GET, "categories", token)?;
        let categories: Option<Vec<Category>> = self.send(request).await?;
        Ok(categories.unwrap_or_default())
    }

    #[instrument(skip_all, fields(slug = %input.slug))]
    async fn create_category(
        &self,
        token: &MerchantToken,
        input: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let request = self.request(Method::POST, "categories", token)?.json(input);
        self.send(request).await
    }

    #[instrument(skip(self, token, input))]
    async fn update_category(
        &self,
        token: &MerchantToken,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, ApiError> {
        let request = self
            .request(Method::PUT, &format!("categories/{id}"), token)?
            .json(input);
        self.send(request).await
    }

    #[instrument(skip(self, token))]
    async fn delete_category(
        &self,
        token: &MerchantToken,
        id: CategoryId,
    ) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("categories/{id}"), token)?;
        self.send_empty(request).await
    }

    #[instrument(skip_all)]
    async fn list_products(&self, token: &MerchantToken) -> Result<Vec<Product>, ApiError> {
        let request = self.request(Method::GET, "products", token)?;
        let products: Option<Vec<Product>> = self.send(request).await?;
        Ok(products.unwrap_or_default())
    }

    #[instrument(skip_all)]
    async fn create_product(
        &self,
        token: &MerchantToken,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let request = self.request(Method::POST, "products", token)?.json(input);
        self.send(request).await
    }

    #[instrument(skip(self, token, input))]
    async fn update_product(
        &self,
        token: &MerchantToken,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let request = self
            .request(Method::PUT, &format!("products/{id}"), token)?
            .json(input);
        self.send(request).await
    }

    #[instrument(skip(self, token))]
    async fn delete_product(&self, token: &MerchantToken, id: ProductId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("products/{id}"), token)?;
        self.send_empty(request).await
    }

    #[instrument(skip_all)]
    async fn list_brands(&self, token: &MerchantToken) -> Result<Vec<Brand>, ApiError> {
        let request = self.request(Method::GET, "brands", token)?;
        let brands: Option<Vec<Brand>> = self.send(request).await?;
        Ok(brands.unwrap_or_default())
    }

    #[instrument(skip_all)]
    async fn store_settings(&self, token: &MerchantToken) -> Result<StoreSettings, ApiError> {
        let request = self.request(Method::GET, "site-config", token)?;
        let raw: RawStoreSettings = self.send(request).await?;
        Ok(raw.into())
    }

    #[instrument(skip(self, token))]
    async fn page_by_slug(
        &self,
        token: &MerchantToken,
        slug: &str,
    ) -> Result<Option<Page>, ApiError> {
        let path = format!("pages/slug/{}", urlencoding::encode(slug));
        let request = self.request(Method::GET, &path, token)?;
        match self.send::<Option<Page>>(request).await {
            Ok(page) => Ok(page),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all, fields(slug = %page.slug))]
    async fn create_page(&self, token: &MerchantToken, page: &NewPage) -> Result<Page, ApiError> {
        let request = self.request(Method::POST, "pages", token)?.json(page);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"message":"SKU already taken"}"#), "SKU already taken");
        assert_eq!(error_message(""), "no details");
        assert_eq!(error_message(&"y".repeat(300)).len(), MAX_ERROR_BODY);
    }
}
