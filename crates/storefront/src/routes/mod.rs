//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (database)
//!
//! # Content
//! GET  /api/site-config               - Store settings (cached)
//! GET  /api/pages/{slug}              - Page, or virtual system page
//!
//! # Auth (rate limited)
//! GET  /api/auth/session              - Current flow state
//! GET  /api/auth/me                   - Logged-in customer (401 otherwise)
//! POST /api/auth/login                - Email + password
//! POST /api/auth/two-factor           - TOTP code for a pending login
//! POST /api/auth/signup               - Register
//! POST /api/auth/verify-email         - Emailed verification code
//! POST /api/auth/resend-code          - Resend verification code
//! POST /api/auth/two-factor/setup     - Issue TOTP secret + QR code
//! POST /api/auth/two-factor/enable    - Confirm TOTP enrolment
//! POST /api/auth/two-factor/skip      - Decline TOTP enrolment
//! POST /api/auth/cancel               - Abandon the flow
//! POST /api/auth/logout               - Log out
//! ```

pub mod auth;
pub mod pages;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(auth::current))
        .route("/me", get(auth::me))
        .route("/login", post(auth::login))
        .route("/two-factor", post(auth::two_factor))
        .route("/signup", post(auth::signup))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-code", post(auth::resend_code))
        .route("/two-factor/setup", post(auth::two_factor_setup))
        .route("/two-factor/enable", post(auth::two_factor_enable))
        .route("/two-factor/skip", post(auth::two_factor_skip))
        .route("/cancel", post(auth::cancel))
        .route("/logout", post(auth::logout))
}

/// Create the content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/site-config", get(pages::site_config))
        .route("/pages/{slug}", get(pages::show))
}

/// Liveness check.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness check: the session database must answer.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
