//! Backend request and response shapes.
//!
//! The backend speaks camelCase JSON. Responses that can take several shapes
//! (login, signup) are decoded into a raw struct and then narrowed into an
//! enum so callers never inspect optional flags.

use kawn_core::{CustomerId, Language, StoreType};
use serde::{Deserialize, Deserializer, Serialize};

use super::ApiError;
use crate::models::SessionToken;

// =============================================================================
// Customers
// =============================================================================

/// A customer as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    /// Store the account belongs to. Kept raw; the auth flow validates it.
    #[serde(default)]
    pub tenant_subdomain: Option<String>,
    /// Dashboard permissions, present for employee accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

/// A successful authentication: token plus customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub token: SessionToken,
    pub customer: Customer,
    pub is_employee: bool,
}

/// Result of `POST /customers/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// Credentials accepted, no second factor configured.
    Authenticated(AuthSuccess),
    /// Credentials accepted, a TOTP code is required.
    TwoFactorRequired {
        customer_id: CustomerId,
        /// Present when the backend asks the customer to finish enrolment.
        setup: Option<TwoFactorSetup>,
    },
}

/// Result of `POST /customers/signup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupStep {
    /// The store requires merchant approval of new accounts.
    ApprovalRequired,
    /// A verification code was emailed.
    VerificationSent,
    /// The account is active and logged in.
    Authenticated(AuthSuccess),
}

/// Profile submitted on signup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// TOTP enrolment material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetup {
    pub secret: String,
    /// Data URL of the QR code image.
    pub qr_code: String,
}

/// Raw auth response body shared by login, signup and verification.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub is_employee: bool,
    #[serde(default)]
    pub requires_two_factor: bool,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub verification_code_sent: bool,
}

impl RawAuthResponse {
    /// Token and customer, if both are present and the token is non-empty.
    fn auth_success(self) -> Option<AuthSuccess> {
        let token = self.token.filter(|t| !t.is_empty())?;
        Some(AuthSuccess {
            token: SessionToken::new(token),
            customer: self.customer?,
            is_employee: self.is_employee,
        })
    }

    pub(crate) fn into_login_step(self) -> Result<LoginStep, ApiError> {
        if self.requires_two_factor {
            let customer_id = self
                .customer_id
                .or_else(|| self.customer.as_ref().map(|c| c.id))
                .ok_or_else(|| {
                    ApiError::UnexpectedResponse("two-factor login without customerId".into())
                })?;
            let setup = match (self.secret, self.qr_code) {
                (Some(secret), Some(qr_code)) => Some(TwoFactorSetup { secret, qr_code }),
                _ => None,
            };
            return Ok(LoginStep::TwoFactorRequired { customer_id, setup });
        }
        self.into_auth_success().map(LoginStep::Authenticated)
    }

    pub(crate) fn into_signup_step(self) -> Result<SignupStep, ApiError> {
        if self.requires_approval {
            return Ok(SignupStep::ApprovalRequired);
        }
        if self.verification_code_sent {
            return Ok(SignupStep::VerificationSent);
        }
        self.into_auth_success().map(SignupStep::Authenticated)
    }

    pub(crate) fn into_auth_success(self) -> Result<AuthSuccess, ApiError> {
        self.auth_success()
            .ok_or_else(|| ApiError::UnexpectedResponse("missing token or customer".into()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecoveryCodesResponse {
    #[serde(default)]
    pub recovery_codes: Vec<String>,
}

// =============================================================================
// Site configuration
// =============================================================================

/// A navigation link in the store header or footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// Per-store presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default)]
    pub store_name: String,
    /// Theme tokens, passed through to the client untouched.
    #[serde(default)]
    pub theme: serde_json::Value,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub header_links: Vec<NavLink>,
    #[serde(default)]
    pub footer_links: Vec<NavLink>,
    #[serde(default, deserialize_with = "lenient_store_type")]
    pub store_type: StoreType,
    #[serde(default, deserialize_with = "lenient_language")]
    pub language: Language,
}

fn lenient_store_type<'de, D: Deserializer<'de>>(d: D) -> Result<StoreType, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .as_deref()
        .map(StoreType::from_backend)
        .unwrap_or_default())
}

fn lenient_language<'de, D: Deserializer<'de>>(d: D) -> Result<Language, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .as_deref()
        .map(Language::from_code)
        .unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawAuthResponse {
        serde_json::from_value(value).unwrap()
    }

    fn customer_json() -> serde_json::Value {
        json!({ "id": 7, "name": "Sara", "email": "sara@example.com", "tenantSubdomain": "shop1" })
    }

    #[test]
    fn test_login_direct_token() {
        let step = raw(json!({ "token": "tok", "customer": customer_json() }))
            .into_login_step()
            .unwrap();
        let LoginStep::Authenticated(success) = step else {
            panic!("expected authenticated");
        };
        assert_eq!(success.token.expose(), "tok");
        assert_eq!(success.customer.tenant_subdomain.as_deref(), Some("shop1"));
        assert!(!success.is_employee);
    }

    #[test]
    fn test_login_two_factor_ignores_token() {
        let step = raw(json!({ "requiresTwoFactor": true, "customerId": 7, "token": "tok" }))
            .into_login_step()
            .unwrap();
        assert_eq!(
            step,
            LoginStep::TwoFactorRequired {
                customer_id: CustomerId::new(7),
                setup: None
            }
        );
    }

    #[test]
    fn test_login_two_factor_without_id_is_unexpected() {
        let err = raw(json!({ "requiresTwoFactor": true }))
            .into_login_step()
            .unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_login_empty_token_is_unexpected() {
        let err = raw(json!({ "token": "", "customer": customer_json() }))
            .into_login_step()
            .unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_signup_steps() {
        assert_eq!(
            raw(json!({ "requiresApproval": true })).into_signup_step().unwrap(),
            SignupStep::ApprovalRequired
        );
        assert_eq!(
            raw(json!({ "verificationCodeSent": true }))
                .into_signup_step()
                .unwrap(),
            SignupStep::VerificationSent
        );
        assert!(matches!(
            raw(json!({ "token": "t", "customer": customer_json() }))
                .into_signup_step()
                .unwrap(),
            SignupStep::Authenticated(_)
        ));
    }

    #[test]
    fn test_site_config_lenient_enums() {
        let config: SiteConfig = serde_json::from_value(json!({
            "storeName": "Cards",
            "storeType": "digital_cards",
            "language": "en-US",
        }))
        .unwrap();
        assert_eq!(config.store_type, StoreType::Digital);
        assert_eq!(config.language, Language::En);
        assert!(config.header_links.is_empty());

        let config: SiteConfig = serde_json::from_value(json!({ "storeType": null })).unwrap();
        assert_eq!(config.store_type, StoreType::General);
        assert_eq!(config.language, Language::Ar);
    }
}
