//! Page materialisation for the page designer.
//!
//! System pages are served virtually until a merchant opens them in the
//! designer. Opening one writes the placeholder content to the backend so
//! later loads see a real record.

use kawn_core::pages::{is_system_slug, virtual_page};
use kawn_core::{Page, Slug};
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::{ApiError, MerchantApi, MerchantToken, NewPage};

/// Errors that can occur while materialising a page.
#[derive(Debug, Error)]
pub enum PageError {
    /// No record exists and the slug is not a system page.
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),
}

/// Result of [`materialize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// The page was already persisted.
    Existing(Page),
    /// The page was created from its virtual content.
    Created(Page),
}

impl Materialized {
    /// Take the persisted page.
    #[must_use]
    pub fn into_page(self) -> Page {
        match self {
            Self::Existing(page) | Self::Created(page) => page,
        }
    }
}

/// Make sure `slug` has a persisted page, creating it from virtual content
/// if needed.
///
/// # Errors
///
/// Returns [`PageError::NotFound`] for malformed slugs and for non-system
/// slugs with no record, and [`PageError::Backend`] if a backend call fails.
/// Creating a page also fails if the store settings cannot be loaded.
#[instrument(skip(api, token))]
pub async fn materialize(
    api: &dyn MerchantApi,
    token: &MerchantToken,
    slug: &str,
) -> Result<Materialized, PageError> {
    let slug = Slug::parse(slug).map_err(|_| PageError::NotFound(slug.to_string()))?;

    if let Some(page) = api.page_by_slug(token, slug.as_str()).await? {
        return Ok(Materialized::Existing(page));
    }
    if !is_system_slug(slug.as_str()) {
        return Err(PageError::NotFound(slug.to_string()));
    }

    let settings = api.store_settings(token).await?;
    let page = virtual_page(slug.as_str(), settings.store_type, settings.language)
        .ok_or_else(|| PageError::NotFound(slug.to_string()))?;

    let created = api
        .create_page(
            token,
            &NewPage {
                slug: page.slug,
                title: page.title,
                content: page.content,
                is_published: true,
            },
        )
        .await?;
    info!(slug = %slug, "Materialised system page");
    Ok(Materialized::Created(created))
}
