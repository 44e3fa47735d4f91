//! Auth flow states.
//!
//! The whole flow is one value persisted under the `auth_flow` session key.
//! Operations read it, compute the next value, and only then write it back,
//! so a failed operation leaves the stored state untouched.

use kawn_core::{CustomerId, Email};
use serde::{Deserialize, Serialize};

use crate::api::TwoFactorSetup;
use crate::models::{CurrentCustomer, CustomerSession};

/// A TOTP challenge awaiting a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTwoFactor {
    pub customer_id: CustomerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
}

impl PendingTwoFactor {
    /// A plain challenge with no enrolment material.
    #[must_use]
    pub const fn challenge(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            secret: None,
            qr_code: None,
        }
    }

    /// A challenge that also carries a freshly issued secret.
    #[must_use]
    pub fn enrolment(customer_id: CustomerId, setup: TwoFactorSetup) -> Self {
        Self {
            customer_id,
            secret: Some(setup.secret),
            qr_code: Some(setup.qr_code),
        }
    }
}

/// Where a customer is in the login/signup flow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthFlowState {
    #[default]
    Anonymous,
    TwoFactorPending {
        pending: PendingTwoFactor,
        return_to: String,
    },
    VerificationPending {
        email: Email,
        return_to: String,
    },
    TwoFactorSetupOffered {
        session: CustomerSession,
        return_to: String,
    },
    TwoFactorSetupPending {
        session: CustomerSession,
        pending: PendingTwoFactor,
        return_to: String,
    },
    /// The account awaits merchant approval.
    RequestPending {
        email: Email,
    },
    Authenticated(CustomerSession),
}

impl AuthFlowState {
    /// Stable snake_case name, also used as the `state` tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::TwoFactorPending { .. } => "two_factor_pending",
            Self::VerificationPending { .. } => "verification_pending",
            Self::TwoFactorSetupOffered { .. } => "two_factor_setup_offered",
            Self::TwoFactorSetupPending { .. } => "two_factor_setup_pending",
            Self::RequestPending { .. } => "request_pending",
            Self::Authenticated(_) => "authenticated",
        }
    }

    /// The logged-in session, if any.
    ///
    /// Setup states count: the email is verified and the backend has
    /// already issued a token.
    #[must_use]
    pub const fn session(&self) -> Option<&CustomerSession> {
        match self {
            Self::Authenticated(session)
            | Self::TwoFactorSetupOffered { session, .. }
            | Self::TwoFactorSetupPending { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Client-facing view. Never contains tokens.
    #[must_use]
    pub fn view(&self) -> AuthStatus {
        let mut status = AuthStatus {
            state: self.name(),
            email: None,
            customer: None,
            two_factor_setup: None,
        };
        match self {
            Self::VerificationPending { email, .. } | Self::RequestPending { email } => {
                status.email = Some(email.as_str().to_owned());
            }
            Self::TwoFactorPending { pending, .. } => {
                status.two_factor_setup = pending_setup(pending);
            }
            Self::TwoFactorSetupPending {
                session, pending, ..
            } => {
                status.customer = Some(session.customer.clone());
                status.two_factor_setup = pending_setup(pending);
            }
            Self::TwoFactorSetupOffered { session, .. } | Self::Authenticated(session) => {
                status.customer = Some(session.customer.clone());
            }
            Self::Anonymous => {}
        }
        status
    }
}

fn pending_setup(pending: &PendingTwoFactor) -> Option<TwoFactorSetup> {
    match (&pending.secret, &pending.qr_code) {
        (Some(secret), Some(qr_code)) => Some(TwoFactorSetup {
            secret: secret.clone(),
            qr_code: qr_code.clone(),
        }),
        _ => None,
    }
}

/// JSON body describing the flow state to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CurrentCustomer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_factor_setup: Option<TwoFactorSetup>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::SessionToken;

    fn session() -> CustomerSession {
        CustomerSession {
            token: SessionToken::new("tok".to_string()),
            customer: CurrentCustomer {
                id: CustomerId::new(1),
                name: "Sara".to_string(),
                email: "sara@example.com".to_string(),
                tenant_subdomain: Some("shop1".to_string()),
                permissions: None,
            },
            is_employee: false,
        }
    }

    #[test]
    fn test_state_round_trips_through_session_json() {
        let state = AuthFlowState::TwoFactorSetupPending {
            session: session(),
            pending: PendingTwoFactor::enrolment(
                CustomerId::new(1),
                TwoFactorSetup {
                    secret: "JBSWY3DP".to_string(),
                    qr_code: "data:image/png;base64,AA".to_string(),
                },
            ),
            return_to: "/account".to_string(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "two_factor_setup_pending");
        let back: AuthFlowState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_authenticated_tag() {
        let json = serde_json::to_value(AuthFlowState::Authenticated(session())).unwrap();
        assert_eq!(json["state"], "authenticated");
        assert_eq!(json["token"], "tok");
    }

    #[test]
    fn test_view_hides_token() {
        let view = AuthFlowState::Authenticated(session()).view();
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("tok\""));
        assert_eq!(view.state, "authenticated");
        assert_eq!(view.customer.unwrap().name, "Sara");
    }

    #[test]
    fn test_view_exposes_setup_material() {
        let state = AuthFlowState::TwoFactorPending {
            pending: PendingTwoFactor::challenge(CustomerId::new(1)),
            return_to: "/".to_string(),
        };
        assert!(state.view().two_factor_setup.is_none());
        assert!(state.session().is_none());
    }
}
