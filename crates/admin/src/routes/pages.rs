//! Page designer handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use kawn_core::Page;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::MerchantAuth;
use crate::pages::{self, Materialized};
use crate::state::AppState;

/// `POST /api/pages/{slug}/materialize`
///
/// `201 Created` when the page was written from its virtual content,
/// `200 OK` when it already existed.
#[instrument(skip(state, token))]
pub async fn materialize(
    State(state): State<AppState>,
    MerchantAuth(token): MerchantAuth,
    Path(slug): Path<String>,
) -> Result<(StatusCode, Json<Page>)> {
    let materialized = pages::materialize(state.api(), &token, &slug).await?;
    let status = match materialized {
        Materialized::Created(_) => StatusCode::CREATED,
        Materialized::Existing(_) => StatusCode::OK,
    };
    Ok((status, Json(materialized.into_page())))
}
