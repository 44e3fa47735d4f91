//! Category and product import, export and bulk delete handlers.

use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::xlsx_download;
use crate::api::BulkDeleteRequest;
use crate::bulk::{self, BulkDeleteReport};
use crate::error::{AppError, Result};
use crate::export;
use crate::import::{ImportError, ImportReport, Importer};
use crate::middleware::MerchantAuth;
use crate::state::AppState;

/// Multipart field holding the uploaded workbook.
const FILE_FIELD: &str = "file";

/// How an import report is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Xlsx,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub format: ReportFormat,
}

// =============================================================================
// Import
// =============================================================================

/// `POST /api/categories/import`
#[instrument(skip_all)]
pub async fn import_categories(
    State(state): State<AppState>,
    MerchantAuth(token): MerchantAuth,
    Query(query): Query<ImportQuery>,
    multipart: Multipart,
) -> Result<Response> {
    let bytes = read_upload(multipart, state.config().import.max_bytes).await?;
    let report = Importer::new(state.api(), &token, state.config().import.batch_size)
        .import_categories(&bytes)
        .await?;
    report_response(&report, query.format, "category-import-errors.xlsx")
}

/// `POST /api/products/import`
#[instrument(skip_all)]
pub async fn import_products(
    State(state): State<AppState>,
    MerchantAuth(token): MerchantAuth,
    Query(query): Query<ImportQuery>,
    multipart: Multipart,
) -> Result<Response> {
    let bytes = read_upload(multipart, state.config().import.max_bytes).await?;
    let report = Importer::new(state.api(), &token, state.config().import.batch_size)
        .import_products(&bytes)
        .await?;
    report_response(&report, query.format, "product-import-errors.xlsx")
}

/// Pull the `file` field out of the upload, enforcing the size limit.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Vec<u8>> {
    let too_large = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::Import(ImportError::TooLarge(max_bytes))
        } else {
            AppError::BadRequest(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(too_large)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let bytes = field.bytes().await.map_err(too_large)?;
        if bytes.len() > max_bytes {
            return Err(ImportError::TooLarge(max_bytes).into());
        }
        return Ok(bytes.to_vec());
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

fn report_response(report: &ImportReport, format: ReportFormat, filename: &str) -> Result<Response> {
    match format {
        ReportFormat::Json => Ok(Json(report).into_response()),
        ReportFormat::Xlsx => Ok(xlsx_download(report.to_xlsx()?, filename)),
    }
}

// =============================================================================
// Export
// =============================================================================

/// `GET /api/categories/export`
#[instrument(skip_all)]
pub async fn export_categories(
    State(state): State<AppState>,
    MerchantAuth(token): MerchantAuth,
) -> Result<Response> {
    let bytes = export::export_categories(state.api(), &token).await?;
    Ok(xlsx_download(bytes, &export_filename("categories")))
}

/// `GET /api/products/export`
#[instrument(skip_all)]
pub async fn export_products(
    State(state): State<AppState>,
    MerchantAuth(token): MerchantAuth,
) -> Result<Response> {
    let bytes = export::export_products(state.api(), &token).await?;
    Ok(xlsx_download(bytes, &export_filename("products")))
}

fn export_filename(entity: &str) -> String {
    format!("{entity}-{}.xlsx", chrono::Utc::now().format("%Y%m%d-%H%M%S"))
}

// =============================================================================
// Bulk delete
// =============================================================================

/// `POST /api/categories/bulk-delete`
#[instrument(skip_all)]
pub async fn delete_categories(
    State(state): State<AppState>,
    MerchantAuth(token): MerchantAuth,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteReport>> {
    ensure_ids(&request)?;
    let report = bulk::delete_categories(
        state.api(),
        &token,
        &request.ids,
        state.config().import.batch_size,
    )
    .await;
    Ok(Json(report))
}

/// `POST /api/products/bulk-delete`
#[instrument(skip_all)]
pub async fn delete_products(
    State(state): State<AppState>,
    MerchantAuth(token): MerchantAuth,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteReport>> {
    ensure_ids(&request)?;
    let report = bulk::delete_products(
        state.api(),
        &token,
        &request.ids,
        state.config().import.batch_size,
    )
    .await;
    Ok(Json(report))
}

fn ensure_ids(request: &BulkDeleteRequest) -> Result<()> {
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("No IDs selected".to_string()));
    }
    Ok(())
}
