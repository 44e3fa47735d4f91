//! Unified error handling for admin.
//!
//! Errors render as `{"code", "title", "description"}` JSON, the same shape
//! the storefront uses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::api::ApiError;
use crate::export::ExportError;
use crate::import::ImportError;
use crate::pages::PageError;

/// Application-level error type for the admin service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),

    /// Import could not start.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Export failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Page materialisation failed.
    #[error("Page error: {0}")]
    Page(#[from] PageError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub title: &'static str,
    pub description: String,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str, String) {
        match self {
            Self::Backend(err)
            | Self::Import(ImportError::Backend(err))
            | Self::Export(ExportError::Backend(err))
            | Self::Page(PageError::Backend(err)) => backend_parts(err),
            Self::Import(ImportError::TooLarge(limit)) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "file_too_large",
                "File too large",
                format!("Upload a file under {limit} bytes"),
            ),
            Self::Import(ImportError::MissingColumns(columns)) => (
                StatusCode::BAD_REQUEST,
                "missing_columns",
                "Missing columns",
                format!("Missing required columns: {}", columns.join(", ")),
            ),
            Self::Import(
                ImportError::Unreadable(_) | ImportError::NoWorksheet | ImportError::Empty,
            ) => (
                StatusCode::BAD_REQUEST,
                "invalid_file",
                "Invalid file",
                "Upload an .xlsx, .xls or .ods file with a header row".to_string(),
            ),
            Self::Page(PageError::NotFound(slug)) => (
                StatusCode::NOT_FOUND,
                "page_not_found",
                "Page not found",
                format!("No page named '{slug}'"),
            ),
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "Invalid request",
                msg.clone(),
            ),
            Self::Import(ImportError::Write(_)) | Self::Export(ExportError::Write(_)) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Something went wrong",
                "Internal server error".to_string(),
            ),
        }
    }

    const fn is_server_error(&self) -> bool {
        match self {
            Self::Backend(err)
            | Self::Import(ImportError::Backend(err))
            | Self::Export(ExportError::Backend(err))
            | Self::Page(PageError::Backend(err)) => !err.is_client_error(),
            Self::Import(err) => !err.is_client_error(),
            Self::Export(ExportError::Write(_)) | Self::Internal(_) => true,
            Self::Page(PageError::NotFound(_)) | Self::BadRequest(_) => false,
        }
    }
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
        ApiError::Http(_) | ApiError::Parse(_) | ApiError::Server { .. } => (
            StatusCode::BAD_GATEWAY,
            "backend_unavailable",
            "Service unavailable",
            "External service error".to_string(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
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
