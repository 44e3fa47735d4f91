//! Merchant authentication extractor.
//!
//! The dashboard forwards the merchant's backend token as a bearer token.
//! The admin service never validates it itself: the backend does, on every
//! call made with it.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use crate::api::MerchantToken;
use crate::error::ErrorBody;

/// Extractor that requires `Authorization: Bearer <token>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn export(MerchantAuth(token): MerchantAuth) -> impl IntoResponse {
///     // call the backend with `token`
/// }
/// ```
pub struct MerchantAuth(pub MerchantToken);

/// Returned when the bearer token is missing or malformed.
#[derive(Debug)]
pub struct MerchantAuthRejection;

impl IntoResponse for MerchantAuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                code: "unauthorized",
                title: "Not signed in",
                description: "A merchant bearer token is required".to_string(),
            }),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for MerchantAuth
where
    S: Send + Sync,
{
    type Rejection = MerchantAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(|token| Self(MerchantToken::new(token)))
            .ok_or(MerchantAuthRejection)
    }
}

/// Extract the token from a `Bearer` authorization value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
