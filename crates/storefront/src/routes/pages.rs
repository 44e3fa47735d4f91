//! Site configuration and page handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use kawn_core::Page;
use tracing::instrument;

use crate::api::SiteConfig;
use crate::error::Result;
use crate::middleware::Tenant;
use crate::state::AppState;

/// `GET /api/site-config`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn site_config(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<SiteConfig>> {
    let config = state.content().site_config(&tenant.subdomain).await?;
    Ok(Json(config))
}

/// `GET /api/pages/{slug}`
///
/// System pages without a record are served as virtual pages.
#[instrument(skip(state, tenant), fields(tenant = %tenant.subdomain))]
pub async fn show(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(slug): Path<String>,
) -> Result<Json<Page>> {
    let page = state.content().load_page(&tenant.subdomain, &slug).await?;
    Ok(Json(page))
}
