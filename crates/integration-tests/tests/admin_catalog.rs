//! Admin spreadsheet import/export, bulk delete and page materialisation.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use kawn_admin::import::{categories, products, write_sheet};
use kawn_integration_tests::{FakeMerchantApi, admin_app, admin_send, brand, multipart_upload};
use serde_json::{Value, json};
use tower::ServiceExt;

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| (*c).to_string()).collect()
}

fn category_sheet(rows: &[Vec<String>]) -> Vec<u8> {
    write_sheet("Categories", categories::COLUMNS, rows).expect("workbook")
}

async fn upload(api: &Arc<FakeMerchantApi>, uri: &str, workbook: &[u8]) -> (StatusCode, Vec<u8>) {
    let router = admin_app(Arc::clone(api));
    let (content_type, body) = multipart_upload(workbook);
    let (status, _, bytes) = admin_send(&router, Method::POST, uri, Some(&content_type), body).await;
    (status, bytes)
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json body")
}

fn read_rows(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).expect("workbook");
    let range = workbook
        .worksheet_range_at(0)
        .expect("first sheet")
        .expect("readable sheet");
    range
        .rows()
        .map(|cells| cells.iter().map(Data::to_string).collect())
        .collect()
}

// =============================================================================
// Import
// =============================================================================

#[tokio::test]
async fn test_import_applies_valid_rows_and_reports_the_rest() {
    let api = Arc::new(FakeMerchantApi::new());
    let workbook = category_sheet(&[
        row(&["Shoes", "أحذية", "Running and casual", "", "", ""]),
        row(&["", "", "No name here", "", "", ""]),
    ]);

    let (status, bytes) = upload(&api, "/api/categories/import", &workbook).await;

    assert_eq!(status, StatusCode::OK);
    let report = json(&bytes);
    assert_eq!(report["total"], 2);
    assert_eq!(report["created"], 1);
    assert_eq!(report["updated"], 0);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["errors"][0]["row"], 3);
    assert_eq!(report["errors"][0]["column"], "Name");

    let stored = api.categories.lock().expect("categories lock");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].slug, "shoes");
}

#[tokio::test]
async fn test_import_error_report_as_workbook() {
    let api = Arc::new(FakeMerchantApi::new());
    let workbook = category_sheet(&[row(&["Bags", "", "", "", "", "missing-parent"])]);
    let router = admin_app(Arc::clone(&api));
    let (content_type, body) = multipart_upload(&workbook);

    let (status, headers, bytes) = admin_send(
        &router,
        Method::POST,
        "/api/categories/import?format=xlsx",
        Some(&content_type),
        body,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], XLSX);
    let rows = read_rows(&bytes);
    assert_eq!(rows[0], row(&["Row", "Column", "Error"]));
    assert_eq!(rows[1][0], "2");
    assert_eq!(rows[1][1], "Parent");
    assert!(api.categories.lock().expect("categories lock").is_empty());
}

#[tokio::test]
async fn test_import_rejects_sheet_without_required_columns() {
    let api = Arc::new(FakeMerchantApi::new());
    let workbook = write_sheet("Products", &["Name", "SKU"], &[row(&["Mug", "MUG-1"])])
        .expect("workbook");

    let (status, bytes) = upload(&api, "/api/products/import", &workbook).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&bytes)["code"], "missing_columns");
    assert!(api.products.lock().expect("products lock").is_empty());
}

#[tokio::test]
async fn test_product_import_resolves_references() {
    let api = Arc::new(
        FakeMerchantApi::new()
            .with_category(5, "Kitchen", "kitchen")
            .with_brand(brand(9, "Acme", "acme")),
    );
    let workbook = write_sheet(
        "Products",
        products::COLUMNS,
        &[
            row(&["Mug", "", "", "", "MUG-1", "12.50", "40", "Kitchen", "acme", "yes"]),
            row(&["Kettle", "", "", "", "KET-1", "30", "", "Garden", "", ""]),
        ],
    )
    .expect("workbook");

    let (status, bytes) = upload(&api, "/api/products/import", &workbook).await;

    assert_eq!(status, StatusCode::OK);
    let report = json(&bytes);
    assert_eq!(report["created"], 1);
    assert_eq!(report["errors"][0]["row"], 3);
    assert_eq!(report["errors"][0]["column"], "Category");

    let stored = api.products.lock().expect("products lock");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].stock, 40);
    assert_eq!(stored[0].category_id.map(i64::from), Some(5));
    assert_eq!(stored[0].brand_id.map(i64::from), Some(9));
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_export_then_reimport_only_updates() {
    let api = Arc::new(
        FakeMerchantApi::new()
            .with_category(1, "Shoes", "shoes")
            .with_category(2, "Bags", "bags"),
    );
    let router = admin_app(Arc::clone(&api));

    let (status, headers, exported) =
        admin_send(&router, Method::GET, "/api/categories/export", None, Vec::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], XLSX);
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().expect("ascii");
    assert!(disposition.starts_with("attachment; filename=\"categories-"));

    let rows = read_rows(&exported);
    assert_eq!(rows[0], row(categories::COLUMNS));
    assert_eq!(rows.len(), 3);

    let (status, bytes) = upload(&api, "/api/categories/import", &exported).await;
    assert_eq!(status, StatusCode::OK);
    let report = json(&bytes);
    assert_eq!(report["created"], 0);
    assert_eq!(report["updated"], 2);
    assert_eq!(report["failed"], 0);
    assert_eq!(api.categories.lock().expect("categories lock").len(), 2);
}

// =============================================================================
// Bulk delete
// =============================================================================

#[tokio::test]
async fn test_bulk_delete_reports_missing_ids() {
    let api = Arc::new(
        FakeMerchantApi::new()
            .with_category(1, "Shoes", "shoes")
            .with_category(2, "Bags", "bags"),
    );
    let router = admin_app(Arc::clone(&api));

    let (status, _, bytes) = admin_send(
        &router,
        Method::POST,
        "/api/categories/bulk-delete",
        Some("application/json"),
        json!({ "ids": [1, 77, 1] }).to_string().into_bytes(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let report = json(&bytes);
    assert_eq!(report["total"], 2);
    assert_eq!(report["deleted"], 1);
    assert_eq!(report["failed"][0]["id"], 77);

    let stored = api.categories.lock().expect("categories lock");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].slug, "bags");
}

#[tokio::test]
async fn test_bulk_delete_requires_ids() {
    let router = admin_app(Arc::new(FakeMerchantApi::new()));

    let (status, _, _) = admin_send(
        &router,
        Method::POST,
        "/api/products/bulk-delete",
        Some("application/json"),
        json!({ "ids": [] }).to_string().into_bytes(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_bearer_is_unauthorized() {
    let router = admin_app(Arc::new(FakeMerchantApi::new()));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/products/export")
        .body(Body::empty())
        .expect("valid request");

    let response = router.oneshot(request).await.expect("infallible router");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_materialize_creates_once() {
    let api = Arc::new(FakeMerchantApi::new());
    let router = admin_app(Arc::clone(&api));

    let (status, _, bytes) =
        admin_send(&router, Method::POST, "/api/pages/about/materialize", None, Vec::new()).await;
    assert_eq!(status, StatusCode::CREATED);
    let page = json(&bytes);
    assert_eq!(page["slug"], "about");
    assert_eq!(page["isVirtual"], false);
    assert!(page["id"].is_i64());

    let (status, _, again) =
        admin_send(&router, Method::POST, "/api/pages/about/materialize", None, Vec::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&again)["id"], page["id"]);
    assert_eq!(api.pages.lock().expect("pages lock").len(), 1);
}

#[tokio::test]
async fn test_materialize_unknown_slug_is_not_found() {
    let api = Arc::new(FakeMerchantApi::new());
    let router = admin_app(Arc::clone(&api));

    let (status, _, bytes) =
        admin_send(&router, Method::POST, "/api/pages/random/materialize", None, Vec::new()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&bytes)["code"], "page_not_found");
    assert!(api.pages.lock().expect("pages lock").is_empty());
}
