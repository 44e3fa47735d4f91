//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//!
//! # Catalog (bearer merchant token)
//! POST /api/categories/import           - Multipart `file`; `?format=xlsx` for an error workbook
//! GET  /api/categories/export           - Download every category
//! POST /api/categories/bulk-delete      - `{"ids": [...]}`
//! POST /api/products/import
//! GET  /api/products/export
//! POST /api/products/bulk-delete
//!
//! # Pages
//! POST /api/pages/{slug}/materialize    - Persist a virtual system page
//! ```

pub mod catalog;
pub mod pages;

use axum::{
    Router,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::state::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Create the API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/categories/import", post(catalog::import_categories))
        .route("/categories/export", get(catalog::export_categories))
        .route("/categories/bulk-delete", post(catalog::delete_categories))
        .route("/products/import", post(catalog::import_products))
        .route("/products/export", get(catalog::export_products))
        .route("/products/bulk-delete", post(catalog::delete_products))
        .route("/pages/{slug}/materialize", post(pages::materialize))
}

/// Liveness check.
pub async fn health() -> &'static str {
    "ok"
}

/// Serve workbook bytes as a file download.
fn xlsx_download(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
