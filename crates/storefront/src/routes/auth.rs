//! Authentication route handlers.
//!
//! JSON endpoints driving the auth flow. Each handler loads the flow state
//! from the session, runs one operation, and persists the result only if
//! the operation succeeded.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{
    RequireAuth, Tenant, clear_customer_session, load_auth_flow, save_auth_flow,
};
use crate::models::CurrentCustomer;
use crate::services::auth::{
    self, AuthFlow, AuthFlowState, AuthStatus, LoginOutcome, SignupProfile, Step,
};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Signup request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupBody {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// A 6-digit code from email or an authenticator app.
#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// Flow state plus where to go next.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub status: AuthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cross_tenant: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recovery_codes: Vec<String>,
}

impl AuthResponse {
    fn status(state: &AuthFlowState) -> Self {
        Self {
            status: state.view(),
            redirect_to: None,
            cross_tenant: false,
            recovery_codes: Vec::new(),
        }
    }
}

/// Persist a step and describe it to the client.
async fn apply(
    state: &AppState,
    tenant: &Tenant,
    session: &Session,
    step: Step,
) -> Result<AuthResponse> {
    match step {
        Step::Continue(next) => {
            save_auth_flow(session, &next).await?;
            Ok(AuthResponse::status(&next))
        }
        Step::LoggedIn {
            session: customer_session,
            return_to,
        } => {
            let outcome = auth::complete(
                session,
                state.login_events(),
                state.resolver(),
                &tenant.context,
                customer_session,
                &return_to,
            )
            .await?;
            let flow = load_auth_flow(session).await?;
            Ok(AuthResponse {
                status: flow.view(),
                cross_tenant: matches!(outcome, LoginOutcome::CrossTenantRedirect(_)),
                redirect_to: Some(outcome.url().to_string()),
                recovery_codes: Vec::new(),
            })
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/auth/session`
#[instrument(skip_all)]
pub async fn current(session: Session) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    Ok(Json(AuthResponse::status(&flow)))
}

/// `GET /api/auth/me`
///
/// The logged-in customer, or 401.
pub async fn me(RequireAuth(customer): RequireAuth) -> Json<CurrentCustomer> {
    Json(customer)
}

/// `POST /api/auth/login`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn login(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    let step = AuthFlow::new(state.api(), &tenant.subdomain)
        .login(&flow, &body.email, &body.password, body.return_to.as_deref())
        .await?;
    Ok(Json(apply(&state, &tenant, &session, step).await?))
}

/// `POST /api/auth/two-factor`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn two_factor(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
    Json(body): Json<CodeRequest>,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    let step = AuthFlow::new(state.api(), &tenant.subdomain)
        .submit_two_factor(&flow, &body.code)
        .await?;
    Ok(Json(apply(&state, &tenant, &session, step).await?))
}

/// `POST /api/auth/signup`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn signup(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
    Json(body): Json<SignupBody>,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    let profile = SignupProfile {
        name: body.name,
        email: body.email,
        password: body.password,
        phone: body.phone,
    };
    let step = AuthFlow::new(state.api(), &tenant.subdomain)
        .signup(&flow, profile, body.return_to.as_deref())
        .await?;
    Ok(Json(apply(&state, &tenant, &session, step).await?))
}

/// `POST /api/auth/verify-email`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn verify_email(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
    Json(body): Json<CodeRequest>,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    let step = AuthFlow::new(state.api(), &tenant.subdomain)
        .verify_email(&flow, &body.code)
        .await?;
    Ok(Json(apply(&state, &tenant, &session, step).await?))
}

/// `POST /api/auth/resend-code`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn resend_code(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    AuthFlow::new(state.api(), &tenant.subdomain)
        .resend_verification_code(&flow)
        .await?;
    Ok(Json(AuthResponse::status(&flow)))
}

/// `POST /api/auth/two-factor/setup`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn two_factor_setup(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    let step = AuthFlow::new(state.api(), &tenant.subdomain)
        .begin_two_factor_setup(&flow)
        .await?;
    Ok(Json(apply(&state, &tenant, &session, step).await?))
}

/// `POST /api/auth/two-factor/enable`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn two_factor_enable(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
    Json(body): Json<CodeRequest>,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    let (step, recovery_codes) = AuthFlow::new(state.api(), &tenant.subdomain)
        .confirm_two_factor_setup(&flow, &body.code)
        .await?;
    let mut response = apply(&state, &tenant, &session, step).await?;
    response.recovery_codes = recovery_codes;
    Ok(Json(response))
}

/// `POST /api/auth/two-factor/skip`
#[instrument(skip_all, fields(tenant = %tenant.subdomain))]
pub async fn two_factor_skip(
    State(state): State<AppState>,
    tenant: Tenant,
    session: Session,
) -> Result<Json<AuthResponse>> {
    let flow = load_auth_flow(&session).await?;
    let step = auth::skip_two_factor_setup(&flow)?;
    Ok(Json(apply(&state, &tenant, &session, step).await?))
}

/// `POST /api/auth/cancel`
#[instrument(skip_all)]
pub async fn cancel(session: Session) -> Result<Json<AuthResponse>> {
    clear_customer_session(&session).await?;
    let next = auth::cancel();
    save_auth_flow(&session, &next).await?;
    Ok(Json(AuthResponse::status(&next)))
}

/// `POST /api/auth/logout`
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Json<AuthResponse>> {
    auth::logout(&session).await?;
    Ok(Json(AuthResponse::status(&AuthFlowState::Anonymous)))
}
