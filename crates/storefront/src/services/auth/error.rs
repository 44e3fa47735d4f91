//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] kawn_core::EmailError),

    /// Verification or TOTP code is not 6 digits.
    #[error("invalid code: {0}")]
    InvalidCode(#[from] kawn_core::OtpCodeError),

    /// A required field was empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The operation is not valid in the current flow state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The backend refused the request (wrong code, email taken, ...).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached or failed.
    #[error("backend error: {0}")]
    Backend(ApiError),

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(_) | ApiError::NotFound(_) => Self::InvalidCredentials,
            ApiError::Rejected { message, .. } => Self::Rejected(message),
            other => Self::Backend(other),
        }
    }
}

impl AuthError {
    /// Whether the error was caused by the client's input rather than a failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Backend(_) | Self::Session(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_mapping() {
        assert!(matches!(
            AuthError::from(ApiError::Unauthorized("bad".into())),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from(ApiError::NotFound("no such customer".into())),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from(ApiError::Rejected {
                status: 422,
                message: "Invalid code".into()
            }),
            AuthError::Rejected(m) if m == "Invalid code"
        ));
        let backend = AuthError::from(ApiError::RateLimited(3));
        assert!(matches!(backend, AuthError::Backend(_)));
        assert!(!backend.is_client_error());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AuthError::InvalidTransition {
            operation: "verify email",
            state: "anonymous",
        };
        assert_eq!(err.to_string(), "cannot verify email while anonymous");
    }
}
