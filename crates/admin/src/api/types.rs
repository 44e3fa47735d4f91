//! Merchant API request and response types.

use kawn_core::{BrandId, CategoryId, Language, PageContent, Price, ProductId, Slug, StoreType};
use serde::{Deserialize, Serialize};

/// Merchant bearer token.
///
/// Implements `Debug` manually so the token never reaches logs.
#[derive(Clone, PartialEq, Eq)]
pub struct MerchantToken(String);

impl MerchantToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for MerchantToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MerchantToken([REDACTED])")
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

/// Fields sent to create or update a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub slug: Slug,
    pub parent_id: Option<CategoryId>,
}

/// A brand. Brands are only referenced by products here, never imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// A product as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Fields sent to create or update a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub sku: Option<String>,
    pub price: Price,
    pub stock: u32,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub is_active: bool,
}

// =============================================================================
// Store and pages
// =============================================================================

/// Store settings that shape generated page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreSettings {
    pub store_type: StoreType,
    pub language: Language,
}

/// Raw `/site-config` body; unknown store types and languages fall back to
/// the defaults instead of failing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawStoreSettings {
    #[serde(default)]
    store_type: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl From<RawStoreSettings> for StoreSettings {
    fn from(raw: RawStoreSettings) -> Self {
        Self {
            store_type: raw
                .store_type
                .as_deref()
                .map(StoreType::from_backend)
                .unwrap_or_default(),
            language: raw
                .language
                .as_deref()
                .map(Language::from_code)
                .unwrap_or_default(),
        }
    }
}

/// A page to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPage {
    pub slug: String,
    pub title: String,
    pub content: PageContent,
    pub is_published: bool,
}

/// `POST /{categories,products}/bulk-delete` body.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}
