//! Kawn admin library.
//!
//! Merchant-side batch work against the Kawn backend: spreadsheet import
//! and export of categories and products, bulk delete, and materialising
//! virtual pages for the page designer.
//!
//! # Security
//!
//! Every catalog call carries the merchant's own bearer token, so the
//! service can do nothing the merchant could not do directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod batch;
pub mod bulk;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod state;

use axum::{Router, extract::DefaultBodyLimit, routing::get};

use crate::state::AppState;

/// Headroom over the file limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().import.max_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
