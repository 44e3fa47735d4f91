//! In-process test harness for the Kawn services.
//!
//! Both routers run against hand-written fake backends, so the tests need
//! no network, no database and no running server:
//!
//! - [`FakeCustomerApi`] stands in for the customer endpoints the storefront
//!   calls. Sessions live in a `MemoryStore` the test can inspect.
//! - [`FakeMerchantApi`] stands in for the merchant catalog endpoints the
//!   admin service calls, keeping categories and products in memory.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kawn-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use kawn_core::{
    BrandId, CategoryId, CustomerId, Email, Language, OtpCode, Page, PageId, ProductId,
    StoreType, Subdomain,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::session::{Id, Record};
use tower_sessions::{MemoryStore, SessionStore};
use url::Url;

use kawn_admin::api::{
    ApiError as MerchantApiError, Brand, Category, CategoryInput, MerchantApi, MerchantToken,
    NewPage, Product, ProductInput, StoreSettings,
};
use kawn_admin::config::{AdminConfig, BackendApiConfig as AdminBackendConfig, ImportConfig};
use kawn_storefront::api::{
    ApiError, AuthSuccess, Customer, CustomerApi, LoginStep, SignupRequest, SignupStep,
    SiteConfig, TwoFactorSetup,
};
use kawn_storefront::config::{BackendApiConfig, StorefrontConfig, TenantConfig};
use kawn_storefront::content::DEFAULT_SITE_CONFIG_TTL;
use kawn_storefront::middleware::session::SESSION_COOKIE_NAME;
use kawn_storefront::middleware::session_layer;
use kawn_storefront::models::SessionToken;

/// Host every storefront request is sent to.
pub const STORE_HOST: &str = "shop1.kawn.com";

/// The only code the fakes accept.
pub const VALID_CODE: &str = "123456";

/// Bearer token the admin tests send.
pub const MERCHANT_TOKEN: &str = "mt_test_token";

// =============================================================================
// Storefront
// =============================================================================

/// A customer account known to [`FakeCustomerApi`].
#[derive(Debug, Clone)]
pub struct Account {
    pub customer: Customer,
    pub password: String,
    pub two_factor: bool,
}

/// In-memory customer backend.
#[derive(Debug, Default)]
pub struct FakeCustomerApi {
    accounts: Mutex<HashMap<String, Account>>,
    /// Signed up, awaiting the emailed code.
    unverified: Mutex<HashMap<String, Account>>,
    pages: Mutex<HashMap<String, Page>>,
    /// Overrides the default "Shop One".
    store_name: Mutex<Option<String>>,
    login_calls: AtomicUsize,
    signups: AtomicI64,
    approval_required: bool,
}

impl FakeCustomerApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account on `shop1`.
    #[must_use]
    pub fn with_account(self, id: i64, email: &str, password: &str, two_factor: bool) -> Self {
        self.with_account_on("shop1", id, email, password, two_factor)
    }

    /// Register an account belonging to `tenant`.
    #[must_use]
    pub fn with_account_on(
        self,
        tenant: &str,
        id: i64,
        email: &str,
        password: &str,
        two_factor: bool,
    ) -> Self {
        let account = Account {
            customer: Customer {
                id: CustomerId::new(id),
                name: "Test Customer".to_string(),
                email: email.to_string(),
                tenant_subdomain: Some(tenant.to_string()),
                permissions: None,
            },
            password: password.to_string(),
            two_factor,
        };
        self.accounts
            .lock()
            .expect("accounts lock")
            .insert(email.to_string(), account);
        self
    }

    /// Change the store name the backend reports, as a merchant edit would.
    pub fn rename_store(&self, name: &str) {
        *self.store_name.lock().expect("store name lock") = Some(name.to_string());
    }

    /// Make every signup wait for merchant approval.
    #[must_use]
    pub fn requiring_approval(mut self) -> Self {
        self.approval_required = true;
        self
    }

    /// Persist a page.
    #[must_use]
    pub fn with_page(self, page: Page) -> Self {
        self.pages
            .lock()
            .expect("pages lock")
            .insert(page.slug.clone(), page);
        self
    }

    /// Number of login calls that reached the backend.
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    fn account_by_id(&self, id: CustomerId) -> Option<Account> {
        self.accounts
            .lock()
            .expect("accounts lock")
            .values()
            .find(|a| a.customer.id == id)
            .cloned()
    }

    fn success(account: &Account) -> AuthSuccess {
        AuthSuccess {
            token: SessionToken::new(format!("tok_{}", account.customer.id)),
            customer: account.customer.clone(),
            is_employee: false,
        }
    }
}

fn rejected(message: &str) -> ApiError {
    ApiError::Rejected {
        status: 422,
        message: message.to_string(),
    }
}

#[async_trait]
impl CustomerApi for FakeCustomerApi {
    async fn login(
        &self,
        _tenant: &Subdomain,
        email: &Email,
        password: &str,
    ) -> Result<LoginStep, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let account = self
            .accounts
            .lock()
            .expect("accounts lock")
            .get(email.as_str())
            .cloned()
            .filter(|a| a.password == password)
            .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

        if account.two_factor {
            return Ok(LoginStep::TwoFactorRequired {
                customer_id: account.customer.id,
                setup: None,
            });
        }
        Ok(LoginStep::Authenticated(Self::success(&account)))
    }

    async fn verify_two_factor_login(
        &self,
        _tenant: &Subdomain,
        customer_id: CustomerId,
        code: &OtpCode,
    ) -> Result<AuthSuccess, ApiError> {
        let account = self
            .account_by_id(customer_id)
            .ok_or_else(|| ApiError::NotFound("customer".to_string()))?;
        if code.as_str() != VALID_CODE {
            return Err(rejected("Invalid verification code"));
        }
        Ok(Self::success(&account))
    }

    async fn signup(
        &self,
        _tenant: &Subdomain,
        request: &SignupRequest,
    ) -> Result<SignupStep, ApiError> {
        if self
            .accounts
            .lock()
            .expect("accounts lock")
            .contains_key(&request.email)
        {
            return Err(rejected("Email already registered"));
        }
        if self.approval_required {
            return Ok(SignupStep::ApprovalRequired);
        }

        let id = 1000 + self.signups.fetch_add(1, Ordering::SeqCst);
        let account = Account {
            customer: Customer {
                id: CustomerId::new(id),
                name: request.name.clone(),
                email: request.email.clone(),
                tenant_subdomain: Some("shop1".to_string()),
                permissions: None,
            },
            password: request.password.clone(),
            two_factor: false,
        };
        self.unverified
            .lock()
            .expect("unverified lock")
            .insert(request.email.clone(), account);
        Ok(SignupStep::VerificationSent)
    }

    async fn verify_email(
        &self,
        _tenant: &Subdomain,
        email: &Email,
        code: &OtpCode,
    ) -> Result<AuthSuccess, ApiError> {
        if code.as_str() != VALID_CODE {
            return Err(rejected("Invalid verification code"));
        }
        let account = self
            .unverified
            .lock()
            .expect("unverified lock")
            .remove(email.as_str())
            .ok_or_else(|| ApiError::NotFound("signup".to_string()))?;
        let success = Self::success(&account);
        self.accounts
            .lock()
            .expect("accounts lock")
            .insert(email.as_str().to_string(), account);
        Ok(success)
    }

    async fn resend_verification_code(
        &self,
        _tenant: &Subdomain,
        _email: &Email,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn setup_two_factor(
        &self,
        _tenant: &Subdomain,
        _token: &SessionToken,
    ) -> Result<TwoFactorSetup, ApiError> {
        Ok(TwoFactorSetup {
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            qr_code: "data:image/png;base64,AAAA".to_string(),
        })
    }

    async fn enable_two_factor(
        &self,
        _tenant: &Subdomain,
        _token: &SessionToken,
        _code: &OtpCode,
    ) -> Result<Vec<String>, ApiError> {
        Ok(vec!["recovery-1".to_string()])
    }

    async fn site_config(&self, _tenant: &Subdomain) -> Result<SiteConfig, ApiError> {
        let store_name = self
            .store_name
            .lock()
            .expect("store name lock")
            .clone()
            .unwrap_or_else(|| "Shop One".to_string());
        Ok(SiteConfig {
            store_name,
            theme: Value::Null,
            logo_url: None,
            header_links: Vec::new(),
            footer_links: Vec::new(),
            store_type: StoreType::General,
            language: Language::En,
        })
    }

    async fn page_by_slug(&self, _tenant: &Subdomain, slug: &str) -> Result<Option<Page>, ApiError> {
        Ok(self.pages.lock().expect("pages lock").get(slug).cloned())
    }
}

/// Storefront configuration for tests. Nothing here is ever dialled.
#[must_use]
pub fn storefront_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/kawn_test"),
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        api: BackendApiConfig {
            base_url: Url::parse("http://backend.test/v1/").expect("valid url"),
            api_key: None,
            timeout: Duration::from_secs(5),
        },
        tenants: TenantConfig::default(),
        site_config_ttl: DEFAULT_SITE_CONFIG_TTL,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A storefront router plus the session store behind it.
pub struct StorefrontHarness {
    pub router: Router,
    pub store: MemoryStore,
    cookie: Option<String>,
}

impl StorefrontHarness {
    /// Build the storefront over `api`, without rate limiting.
    #[must_use]
    pub fn new(api: Arc<FakeCustomerApi>) -> Self {
        let config = storefront_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(config.database_url.expose_secret())
            .expect("lazy pool");
        let state = kawn_storefront::state::AppState::with_api(config, pool, api);
        let store = MemoryStore::default();
        let router = kawn_storefront::app(state, session_layer(store.clone(), false), false);

        Self {
            router,
            store,
            cookie: None,
        }
    }

    /// Send a request as the same browser, carrying the session cookie.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, STORE_HOST);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={cookie}"));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router");

        // An emptied cookie means the session was deleted.
        if let Some(value) = session_cookie(response.headers()) {
            self.cookie = (!value.is_empty()).then_some(value);
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Keys stored in this browser's session, sorted.
    pub async fn session_keys(&self) -> Vec<String> {
        let Some(cookie) = &self.cookie else {
            return Vec::new();
        };
        let Ok(id) = cookie.parse::<Id>() else {
            return Vec::new();
        };
        let record: Option<Record> = self.store.load(&id).await.expect("store load");
        let mut keys: Vec<String> = record
            .map(|r| r.data.into_keys().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

fn session_cookie(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.to_string())
}

// =============================================================================
// Admin
// =============================================================================

/// In-memory merchant backend.
#[derive(Debug)]
pub struct FakeMerchantApi {
    pub categories: Mutex<Vec<Category>>,
    pub products: Mutex<Vec<Product>>,
    pub brands: Vec<Brand>,
    pub pages: Mutex<Vec<Page>>,
    pub settings: StoreSettings,
    next_id: AtomicI64,
}

impl Default for FakeMerchantApi {
    fn default() -> Self {
        Self {
            categories: Mutex::new(Vec::new()),
            products: Mutex::new(Vec::new()),
            brands: Vec::new(),
            pages: Mutex::new(Vec::new()),
            settings: StoreSettings {
                store_type: StoreType::General,
                language: Language::Ar,
            },
            next_id: AtomicI64::new(100),
        }
    }
}

impl FakeMerchantApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Seed a brand products can reference.
    #[must_use]
    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brands.push(brand);
        self
    }

    /// Seed an existing category.
    #[must_use]
    pub fn with_category(self, id: i64, name: &str, slug: &str) -> Self {
        self.categories.lock().expect("categories lock").push(Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            name_ar: None,
            description: None,
            description_ar: None,
            slug: slug.to_string(),
            parent_id: None,
        });
        self
    }

    fn check(token: &MerchantToken) -> Result<(), MerchantApiError> {
        if token.expose() == MERCHANT_TOKEN {
            Ok(())
        } else {
            Err(MerchantApiError::Unauthorized("invalid token".to_string()))
        }
    }
}

fn category_from(id: CategoryId, input: &CategoryInput) -> Category {
    Category {
        id,
        name: input.name.clone(),
        name_ar: input.name_ar.clone(),
        description: input.description.clone(),
        description_ar: input.description_ar.clone(),
        slug: input.slug.to_string(),
        parent_id: input.parent_id,
    }
}

fn product_from(id: ProductId, input: &ProductInput) -> Product {
    Product {
        id,
        name: input.name.clone(),
        name_ar: input.name_ar.clone(),
        description: input.description.clone(),
        description_ar: input.description_ar.clone(),
        sku: input.sku.clone(),
        price: input.price,
        stock: input.stock,
        category_id: input.category_id,
        brand_id: input.brand_id,
        is_active: input.is_active,
    }
}

#[async_trait]
impl MerchantApi for FakeMerchantApi {
    async fn list_categories(&self, token: &MerchantToken) -> Result<Vec<Category>, MerchantApiError> {
        Self::check(token)?;
        Ok(self.categories.lock().expect("categories lock").clone())
    }

    async fn create_category(
        &self,
        token: &MerchantToken,
        input: &CategoryInput,
    ) -> Result<Category, MerchantApiError> {
        Self::check(token)?;
        let category = category_from(CategoryId::new(self.next_id()), input);
        self.categories
            .lock()
            .expect("categories lock")
            .push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        token: &MerchantToken,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, MerchantApiError> {
        Self::check(token)?;
        let mut categories = self.categories.lock().expect("categories lock");
        let slot = categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| MerchantApiError::NotFound(format!("category {id}")))?;
        *slot = category_from(id, input);
        Ok(slot.clone())
    }

    async fn delete_category(
        &self,
        token: &MerchantToken,
        id: CategoryId,
    ) -> Result<(), MerchantApiError> {
        Self::check(token)?;
        let mut categories = self.categories.lock().expect("categories lock");
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(MerchantApiError::NotFound(format!("Category {id} not found")));
        }
        Ok(())
    }

    async fn list_products(&self, token: &MerchantToken) -> Result<Vec<Product>, MerchantApiError> {
        Self::check(token)?;
        Ok(self.products.lock().expect("products lock").clone())
    }

    async fn create_product(
        &self,
        token: &MerchantToken,
        input: &ProductInput,
    ) -> Result<Product, MerchantApiError> {
        Self::check(token)?;
        let product = product_from(ProductId::new(self.next_id()), input);
        self.products
            .lock()
            .expect("products lock")
            .push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        token: &MerchantToken,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, MerchantApiError> {
        Self::check(token)?;
        let mut products = self.products.lock().expect("products lock");
        let slot = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| MerchantApiError::NotFound(format!("product {id}")))?;
        *slot = product_from(id, input);
        Ok(slot.clone())
    }

    async fn delete_product(&self, token: &MerchantToken, id: ProductId) -> Result<(), MerchantApiError> {
        Self::check(token)?;
        let mut products = self.products.lock().expect("products lock");
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(MerchantApiError::NotFound(format!("Product {id} not found")));
        }
        Ok(())
    }

    async fn list_brands(&self, token: &MerchantToken) -> Result<Vec<Brand>, MerchantApiError> {
        Self::check(token)?;
        Ok(self.brands.clone())
    }

    async fn store_settings(&self, token: &MerchantToken) -> Result<StoreSettings, MerchantApiError> {
        Self::check(token)?;
        Ok(self.settings)
    }

    async fn page_by_slug(
        &self,
        token: &MerchantToken,
        slug: &str,
    ) -> Result<Option<Page>, MerchantApiError> {
        Self::check(token)?;
        Ok(self
            .pages
            .lock()
            .expect("pages lock")
            .iter()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn create_page(&self, token: &MerchantToken, page: &NewPage) -> Result<Page, MerchantApiError> {
        Self::check(token)?;
        let created = Page {
            id: Some(PageId::new(self.next_id())),
            slug: page.slug.clone(),
            title: page.title.clone(),
            content: page.content.clone(),
            is_published: page.is_published,
            is_virtual: false,
        };
        self.pages.lock().expect("pages lock").push(created.clone());
        Ok(created)
    }
}

/// Admin configuration for tests.
#[must_use]
pub fn admin_config() -> AdminConfig {
    AdminConfig {
        host: [127, 0, 0, 1].into(),
        port: 3001,
        api: AdminBackendConfig {
            base_url: Url::parse("http://backend.test/v1/").expect("valid url"),
            timeout: Duration::from_secs(5),
        },
        import: ImportConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The admin router over `api`.
#[must_use]
pub fn admin_app(api: Arc<FakeMerchantApi>) -> Router {
    kawn_admin::app(kawn_admin::state::AppState::with_api(admin_config(), api))
}

/// A multipart body with a single `file` field.
#[must_use]
pub fn multipart_upload(bytes: &[u8]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "kawn-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"import.xlsx\"\r\n\
             Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Send one request to the admin router with the merchant token.
pub async fn admin_send(
    router: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {MERCHANT_TOKEN}"));
    if let Some(content_type) = content_type {
        request = request.header(header::CONTENT_TYPE, content_type);
    }
    let request = request.body(Body::from(body)).expect("valid request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible router");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    (status, headers, bytes.to_vec())
}

/// A brand for seeding [`FakeMerchantApi::brands`].
#[must_use]
pub fn brand(id: i64, name: &str, slug: &str) -> Brand {
    Brand {
        id: BrandId::new(id),
        name: name.to_string(),
        name_ar: None,
        slug: Some(slug.to_string()),
    }
}
