//! Spreadsheet export of categories and products.
//!
//! Exports use the import column schemas, and references are written as
//! slugs (or names for brands without one), so an exported file re-imports
//! cleanly into the same store.

use std::collections::HashMap;

use kawn_core::{BrandId, CategoryId};
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiError, Brand, Category, MerchantApi, MerchantToken, Product};
use crate::import::{categories, products, write_sheet};

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Loading the catalog failed.
    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),

    /// Building the workbook failed.
    #[error("Could not write spreadsheet: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

/// Export every category as `.xlsx`.
///
/// # Errors
///
/// Returns [`ExportError`] if the backend call or workbook rendering fails.
#[instrument(skip_all)]
pub async fn export_categories(
    api: &dyn MerchantApi,
    token: &MerchantToken,
) -> Result<Vec<u8>, ExportError> {
    let categories = api.list_categories(token).await?;
    tracing::info!(count = categories.len(), "Exporting categories");
    Ok(write_sheet(
        "Categories",
        categories::COLUMNS,
        &category_rows(&categories),
    )?)
}

/// Export every product as `.xlsx`.
///
/// # Errors
///
/// Returns [`ExportError`] if a backend call or workbook rendering fails.
#[instrument(skip_all)]
pub async fn export_products(
    api: &dyn MerchantApi,
    token: &MerchantToken,
) -> Result<Vec<u8>, ExportError> {
    let (items, categories, brands) = futures::try_join!(
        api.list_products(token),
        api.list_categories(token),
        api.list_brands(token),
    )?;
    tracing::info!(count = items.len(), "Exporting products");
    Ok(write_sheet(
        "Products",
        products::COLUMNS,
        &product_rows(&items, &categories, &brands),
    )?)
}

/// Category rows in [`categories::COLUMNS`] order.
#[must_use]
pub fn category_rows(categories: &[Category]) -> Vec<Vec<String>> {
    let slugs: HashMap<CategoryId, &str> = categories
        .iter()
        .map(|c| (c.id, c.slug.as_str()))
        .collect();

    categories
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.name_ar.clone().unwrap_or_default(),
                c.description.clone().unwrap_or_default(),
                c.description_ar.clone().unwrap_or_default(),
                c.slug.clone(),
                c.parent_id
                    .and_then(|id| slugs.get(&id))
                    .map(|s| (*s).to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect()
}

/// Product rows in [`products::COLUMNS`] order.
#[must_use]
pub fn product_rows(
    items: &[Product],
    categories: &[Category],
    brands: &[Brand],
) -> Vec<Vec<String>> {
    let category_slugs: HashMap<CategoryId, &str> = categories
        .iter()
        .map(|c| (c.id, c.slug.as_str()))
        .collect();
    let brand_labels: HashMap<BrandId, &str> = brands
        .iter()
        .map(|b| (b.id, b.slug.as_deref().unwrap_or(&b.name)))
        .collect();

    items
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.name_ar.clone().unwrap_or_default(),
                p.description.clone().unwrap_or_default(),
                p.description_ar.clone().unwrap_or_default(),
                p.sku.clone().unwrap_or_default(),
                p.price.to_string(),
                p.stock.to_string(),
                p.category_id
                    .and_then(|id| category_slugs.get(&id))
                    .map(|s| (*s).to_string())
                    .unwrap_or_default(),
                p.brand_id
                    .and_then(|id| brand_labels.get(&id))
                    .map(|s| (*s).to_string())
                    .unwrap_or_default(),
                (if p.is_active { "yes" } else { "no" }).to_string(),
            ]
        })
        .collect()
}
