//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Errors render as
//! `{"code", "title", "description"}` JSON so clients can localise on `code`.
//! Server-side failures are captured to Sentry and their details hidden.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::api::ApiError;
use crate::content::ContentError;
use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Content loading failed.
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub title: &'static str,
    pub description: String,
}

impl AppError {
    /// Status, machine code, title and client-safe description.
    fn parts(&self) -> (StatusCode, &'static str, &'static str, String) {
        match self {
            Self::Auth(err) => auth_parts(err),
            Self::Backend(err) => backend_parts(err),
            Self::Content(ContentError::NotFound(slug)) => (
                StatusCode::NOT_FOUND,
                "page_not_found",
                "Page not found",
                format!("No page named '{slug}'"),
            ),
            Self::Content(ContentError::Backend(err)) => backend_parts(err),
            Self::Session(_) => internal(),
        }
    }

    /// Whether this error is a server-side failure worth reporting.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Auth(err) => !err.is_client_error(),
            Self::Backend(err) | Self::Content(ContentError::Backend(err)) => {
                !err.is_client_error()
            }
            Self::Content(ContentError::NotFound(_)) => false,
            Self::Session(_) => true,
        }
    }
}

fn internal() -> (StatusCode, &'static str, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Something went wrong",
        "Internal server error".to_string(),
    )
}

fn backend_parts(err: &ApiError) -> (StatusCode, &'static str, &'static str, String) {
    match err {
        ApiError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            "not_found",
            "Not found",
            "Resource not found".to_string(),
        ),
        ApiError::Unauthorized(_) => (
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Not signed in",
            "Please sign in again".to_string(),
        ),
        ApiError::Rejected { message, .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "rejected",
            "Request rejected",
            message.clone(),
        ),
        ApiError::RateLimited(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "Too many requests",
            "Please wait a moment and try again".to_string(),
        ),
        _ => (
            StatusCode::BAD_GATEWAY,
            "backend_unavailable",
            "Service unavailable",
            "External service error".to_string(),
        ),
    }
}

fn auth_parts(err: &AuthError) -> (StatusCode, &'static str, &'static str, String) {
    match err {
        AuthError::InvalidEmail(_) => (
            StatusCode::BAD_REQUEST,
            "invalid_email",
            "Invalid email",
            "Invalid email address".to_string(),
        ),
        AuthError::InvalidCode(_) => (
            StatusCode::BAD_REQUEST,
            "invalid_code",
            "Invalid code",
            "Enter the 6-digit code".to_string(),
        ),
        AuthError::MissingField(field) => (
            StatusCode::BAD_REQUEST,
            "missing_field",
            "Missing field",
            format!("{field} is required"),
        ),
        AuthError::WeakPassword(msg) => (
            StatusCode::BAD_REQUEST,
            "weak_password",
            "Weak password",
            msg.clone(),
        ),
        AuthError::InvalidTransition { .. } => (
            StatusCode::CONFLICT,
            "invalid_state",
            "Session expired",
            "Session expired, please try again".to_string(),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Login failed",
            "Invalid credentials".to_string(),
        ),
        AuthError::Rejected(msg) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "rejected",
            "Request rejected",
            msg.clone(),
        ),
        AuthError::Backend(err) => backend_parts(err),
        AuthError::Session(_) => internal(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Client error");
        }

        let (status, code, title, description) = self.parts();
        (
            status,
            Json(ErrorBody {
                code,
                title,
                description,
            }),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with customers.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
