//! Authentication extractors and session helpers.
//!
//! The logged-in customer lives under the `customer_token` and
//! `customer_data` session keys; the in-progress flow under `auth_flow`.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentCustomer, CustomerSession, SessionToken, keys};
use crate::services::auth::AuthFlowState;

/// Extractor that requires a logged-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(customer): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", customer.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Error returned when authentication is required but the customer is not logged in.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or(AuthRejection)?;
        current_customer(session)
            .await
            .map(Self)
            .ok_or(AuthRejection)
    }
}

/// The logged-in customer, if both session keys are present.
async fn current_customer(session: &Session) -> Option<CurrentCustomer> {
    let token = session
        .get::<SessionToken>(keys::CUSTOMER_TOKEN)
        .await
        .ok()
        .flatten();
    token?;
    session
        .get::<CurrentCustomer>(keys::CUSTOMER_DATA)
        .await
        .ok()
        .flatten()
}

/// Write the login keys. `access_token` is written for employees only.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_customer_session(
    session: &Session,
    customer_session: &CustomerSession,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(keys::CUSTOMER_TOKEN, &customer_session.token)
        .await?;
    session
        .insert(keys::CUSTOMER_DATA, &customer_session.customer)
        .await?;
    if customer_session.is_employee {
        session
            .insert(keys::ACCESS_TOKEN, &customer_session.token)
            .await?;
    } else {
        session.remove::<SessionToken>(keys::ACCESS_TOKEN).await?;
    }
    Ok(())
}

/// Remove the login keys (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_customer_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<SessionToken>(keys::CUSTOMER_TOKEN).await?;
    session.remove::<CurrentCustomer>(keys::CUSTOMER_DATA).await?;
    session.remove::<SessionToken>(keys::ACCESS_TOKEN).await?;
    session.remove::<AuthFlowState>(keys::AUTH_FLOW).await?;
    Ok(())
}

/// Read the stored flow state. A missing or unreadable value is `Anonymous`.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_auth_flow(session: &Session) -> Result<AuthFlowState, tower_sessions::session::Error> {
    match session.get::<AuthFlowState>(keys::AUTH_FLOW).await {
        Ok(state) => Ok(state.unwrap_or_default()),
        Err(tower_sessions::session::Error::SerdeJson(_)) => Ok(AuthFlowState::Anonymous),
        Err(e) => Err(e),
    }
}

/// Persist the flow state.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_auth_flow(
    session: &Session,
    state: &AuthFlowState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::AUTH_FLOW, state).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use kawn_core::CustomerId;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn customer_session(is_employee: bool) -> CustomerSession {
        CustomerSession {
            token: SessionToken::new("tok".to_string()),
            customer: CurrentCustomer {
                id: CustomerId::new(3),
                name: "Omar".to_string(),
                email: "omar@example.com".to_string(),
                tenant_subdomain: Some("shop1".to_string()),
                permissions: Some(vec!["orders:read".to_string()]),
            },
            is_employee,
        }
    }

    #[tokio::test]
    async fn test_set_customer_session_writes_keys() {
        let session = session();
        set_customer_session(&session, &customer_session(false))
            .await
            .unwrap();

        assert!(current_customer(&session).await.is_some());
        let access: Option<SessionToken> = session.get(keys::ACCESS_TOKEN).await.unwrap();
        assert!(access.is_none());
    }

    #[tokio::test]
    async fn test_employee_gets_access_token() {
        let session = session();
        set_customer_session(&session, &customer_session(true))
            .await
            .unwrap();
        let access: Option<SessionToken> = session.get(keys::ACCESS_TOKEN).await.unwrap();
        assert_eq!(access.unwrap().expose(), "tok");
    }

    #[tokio::test]
    async fn test_clear_customer_session() {
        let session = session();
        set_customer_session(&session, &customer_session(true))
            .await
            .unwrap();
        save_auth_flow(&session, &AuthFlowState::Authenticated(customer_session(true)))
            .await
            .unwrap();

        clear_customer_session(&session).await.unwrap();
        assert!(current_customer(&session).await.is_none());
        assert_eq!(load_auth_flow(&session).await.unwrap(), AuthFlowState::Anonymous);
    }

    #[tokio::test]
    async fn test_auth_flow_defaults_to_anonymous() {
        let session = session();
        assert_eq!(load_auth_flow(&session).await.unwrap(), AuthFlowState::Anonymous);

        session.insert(keys::AUTH_FLOW, "garbage").await.unwrap();
        assert_eq!(load_auth_flow(&session).await.unwrap(), AuthFlowState::Anonymous);
    }
}
