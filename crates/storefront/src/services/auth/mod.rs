//! Customer authentication flow.
//!
//! Login, signup, email verification and TOTP enrolment against the
//! backend. Every operation takes the current [`AuthFlowState`] and returns a
//! [`Step`]; the caller persists the result. Input is validated before any
//! backend call.

mod complete;
mod error;
mod state;

pub use complete::{LoginOutcome, complete, login_outcome, logout};
pub use error::AuthError;
pub use state::{AuthFlowState, AuthStatus, PendingTwoFactor};

use kawn_core::{Email, OtpCode, Subdomain};
use tracing::{info, instrument};

use crate::api::{CustomerApi, LoginStep, SignupRequest, SignupStep};
use crate::models::CustomerSession;

/// Minimum password length accepted on signup.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Result of an auth flow operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Stay in the flow with a new state.
    Continue(AuthFlowState),
    /// The customer is logged in; run [`complete`].
    LoggedIn {
        session: CustomerSession,
        return_to: String,
    },
}

/// Signup form input.
#[derive(Debug, Clone, Default)]
pub struct SignupProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Auth flow operations for one tenant.
pub struct AuthFlow<'a> {
    api: &'a dyn CustomerApi,
    tenant: &'a Subdomain,
}

impl<'a> AuthFlow<'a> {
    #[must_use]
    pub const fn new(api: &'a dyn CustomerApi, tenant: &'a Subdomain) -> Self {
        Self { api, tenant }
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Log in with email and password.
    ///
    /// Allowed from every state except `Authenticated`. A half-finished
    /// signup, enrolment or approval request is abandoned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`/`MissingField` before calling the
    /// backend, `AuthError::InvalidCredentials` when the backend refuses.
    #[instrument(skip(self, state, password), fields(tenant = %self.tenant))]
    pub async fn login(
        &self,
        state: &AuthFlowState,
        email: &str,
        password: &str,
        return_to: Option<&str>,
    ) -> Result<Step, AuthError> {
        require_signed_out(state, "log in")?;
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        let return_to = sanitize_return_to(return_to);

        match self.api.login(self.tenant, &email, password).await? {
            LoginStep::Authenticated(success) => Ok(Step::LoggedIn {
                session: success.into(),
                return_to,
            }),
            LoginStep::TwoFactorRequired { customer_id, setup } => {
                info!(customer_id = %customer_id, "Two-factor code required");
                let pending = match setup {
                    Some(setup) => PendingTwoFactor::enrolment(customer_id, setup),
                    None => PendingTwoFactor::challenge(customer_id),
                };
                Ok(Step::Continue(AuthFlowState::TwoFactorPending {
                    pending,
                    return_to,
                }))
            }
        }
    }

    /// Submit the TOTP code for a pending login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` for malformed codes and
    /// `AuthError::Rejected` when the backend refuses the code.
    #[instrument(skip(self, state, code), fields(tenant = %self.tenant))]
    pub async fn submit_two_factor(
        &self,
        state: &AuthFlowState,
        code: &str,
    ) -> Result<Step, AuthError> {
        let AuthFlowState::TwoFactorPending { pending, return_to } = state else {
            return Err(invalid(state, "submit a two-factor code"));
        };
        let code = OtpCode::parse(code)?;

        let success = self
            .api
            .verify_two_factor_login(self.tenant, pending.customer_id, &code)
            .await?;
        Ok(Step::LoggedIn {
            session: success.into(),
            return_to: return_to.clone(),
        })
    }

    // =========================================================================
    // Signup
    // =========================================================================

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns a validation error before calling the backend, or
    /// `AuthError::Rejected` when the backend refuses (e.g. email taken).
    #[instrument(skip(self, state, profile), fields(tenant = %self.tenant))]
    pub async fn signup(
        &self,
        state: &AuthFlowState,
        profile: SignupProfile,
        return_to: Option<&str>,
    ) -> Result<Step, AuthError> {
        require_signed_out(state, "sign up")?;
        let name = profile.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        let email = Email::parse(&profile.email)?;
        validate_password(&profile.password)?;
        let return_to = sanitize_return_to(return_to);

        let request = SignupRequest {
            name: name.to_string(),
            email: email.as_str().to_string(),
            password: profile.password,
            phone: profile
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        };

        Ok(match self.api.signup(self.tenant, &request).await? {
            SignupStep::ApprovalRequired => {
                info!("Signup awaits merchant approval");
                Step::Continue(AuthFlowState::RequestPending { email })
            }
            SignupStep::VerificationSent => {
                Step::Continue(AuthFlowState::VerificationPending { email, return_to })
            }
            SignupStep::Authenticated(success) => Step::LoggedIn {
                session: success.into(),
                return_to,
            },
        })
    }

    /// Verify the emailed code. Offers TOTP setup on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` or `AuthError::Rejected`.
    #[instrument(skip(self, state, code), fields(tenant = %self.tenant))]
    pub async fn verify_email(&self, state: &AuthFlowState, code: &str) -> Result<Step, AuthError> {
        let AuthFlowState::VerificationPending { email, return_to } = state else {
            return Err(invalid(state, "verify email"));
        };
        let code = OtpCode::parse(code)?;

        let success = self.api.verify_email(self.tenant, email, &code).await?;
        Ok(Step::Continue(AuthFlowState::TwoFactorSetupOffered {
            session: success.into(),
            return_to: return_to.clone(),
        }))
    }

    /// Ask the backend to email a new verification code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidTransition` outside `VerificationPending`.
    #[instrument(skip(self, state), fields(tenant = %self.tenant))]
    pub async fn resend_verification_code(&self, state: &AuthFlowState) -> Result<(), AuthError> {
        let AuthFlowState::VerificationPending { email, .. } = state else {
            return Err(invalid(state, "resend a verification code"));
        };
        self.api.resend_verification_code(self.tenant, email).await?;
        Ok(())
    }

    // =========================================================================
    // TOTP Enrolment
    // =========================================================================

    /// Issue a TOTP secret and QR code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidTransition` outside `TwoFactorSetupOffered`.
    #[instrument(skip(self, state), fields(tenant = %self.tenant))]
    pub async fn begin_two_factor_setup(&self, state: &AuthFlowState) -> Result<Step, AuthError> {
        let AuthFlowState::TwoFactorSetupOffered { session, return_to } = state else {
            return Err(invalid(state, "start two-factor setup"));
        };

        let setup = self.api.setup_two_factor(self.tenant, &session.token).await?;
        Ok(Step::Continue(AuthFlowState::TwoFactorSetupPending {
            pending: PendingTwoFactor::enrolment(session.customer.id, setup),
            session: session.clone(),
            return_to: return_to.clone(),
        }))
    }

    /// Confirm enrolment with a code from the authenticator app.
    ///
    /// Returns the login step and the recovery codes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` or `AuthError::Rejected`.
    #[instrument(skip(self, state, code), fields(tenant = %self.tenant))]
    pub async fn confirm_two_factor_setup(
        &self,
        state: &AuthFlowState,
        code: &str,
    ) -> Result<(Step, Vec<String>), AuthError> {
        let AuthFlowState::TwoFactorSetupPending {
            session, return_to, ..
        } = state
        else {
            return Err(invalid(state, "confirm two-factor setup"));
        };
        let code = OtpCode::parse(code)?;

        let recovery_codes = self
            .api
            .enable_two_factor(self.tenant, &session.token, &code)
            .await?;
        info!(customer_id = %session.customer.id, "Two-factor enabled");
        Ok((
            Step::LoggedIn {
                session: session.clone(),
                return_to: return_to.clone(),
            },
            recovery_codes,
        ))
    }
}

/// Decline TOTP enrolment and finish logging in.
///
/// # Errors
///
/// Returns `AuthError::InvalidTransition` outside the setup states.
pub fn skip_two_factor_setup(state: &AuthFlowState) -> Result<Step, AuthError> {
    match state {
        AuthFlowState::TwoFactorSetupOffered { session, return_to }
        | AuthFlowState::TwoFactorSetupPending {
            session, return_to, ..
        } => Ok(Step::LoggedIn {
            session: session.clone(),
            return_to: return_to.clone(),
        }),
        _ => Err(invalid(state, "skip two-factor setup")),
    }
}

/// Abandon the flow from any state. Pending 2FA data is discarded.
#[must_use]
pub const fn cancel() -> AuthFlowState {
    AuthFlowState::Anonymous
}

/// Keep `return_to` only if it is a local path.
#[must_use]
pub fn sanitize_return_to(return_to: Option<&str>) -> String {
    return_to
        .map(str::trim)
        .filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.starts_with("/\\"))
        .unwrap_or("/")
        .to_string()
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::MissingField("password"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Login and signup start over from any state but `Authenticated`; whatever
/// the abandoned flow held is replaced by the new step.
fn require_signed_out(state: &AuthFlowState, operation: &'static str) -> Result<(), AuthError> {
    match state {
        AuthFlowState::Authenticated(_) => Err(invalid(state, operation)),
        _ => Ok(()),
    }
}

fn invalid(state: &AuthFlowState, operation: &'static str) -> AuthError {
    AuthError::InvalidTransition {
        operation,
        state: state.name(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::{ApiError, AuthSuccess, Customer, MockCustomerApi, TwoFactorSetup};
    use crate::models::SessionToken;
    use kawn_core::CustomerId;
    use mockall::predicate::eq;
    use rstest::rstest;

    fn tenant() -> Subdomain {
        Subdomain::parse("shop1").unwrap()
    }

    fn success() -> AuthSuccess {
        AuthSuccess {
            token: SessionToken::new("tok".to_string()),
            customer: Customer {
                id: CustomerId::new(7),
                name: "Sara".to_string(),
                email: "sara@example.com".to_string(),
                tenant_subdomain: Some("shop1".to_string()),
                permissions: None,
            },
            is_employee: false,
        }
    }

    fn signed_in() -> CustomerSession {
        success().into()
    }

    #[rstest]
    #[case(Some("/account"), "/account")]
    #[case(Some("/products?page=2"), "/products?page=2")]
    #[case(Some("//evil.test"), "/")]
    #[case(Some("/\\evil.test"), "/")]
    #[case(Some("https://evil.test"), "/")]
    #[case(Some(""), "/")]
    #[case(None, "/")]
    fn test_sanitize_return_to(#[case] input: Option<&str>, #[case] expected: &str) {
        assert_eq!(sanitize_return_to(input), expected);
    }

    #[tokio::test]
    async fn test_login_direct_token() {
        let mut api = MockCustomerApi::new();
        api.expect_login()
            .times(1)
            .returning(|_, _, _| Ok(LoginStep::Authenticated(success())));
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);

        let step = flow
            .login(&AuthFlowState::Anonymous, "Sara@Example.com", "pw", Some("/cart"))
            .await
            .unwrap();
        assert_eq!(
            step,
            Step::LoggedIn {
                session: signed_in(),
                return_to: "/cart".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_login_invalid_email_never_calls_backend() {
        let mut api = MockCustomerApi::new();
        api.expect_login().times(0);
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);

        let err = flow
            .login(&AuthFlowState::Anonymous, "not-an-email", "pw", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));

        let err = flow
            .login(&AuthFlowState::Anonymous, "a@b.com", "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("password")));
    }

    #[tokio::test]
    async fn test_login_unknown_email_is_invalid_credentials() {
        let mut api = MockCustomerApi::new();
        api.expect_login()
            .returning(|_, _, _| Err(ApiError::NotFound("customer".to_string())));
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);

        let err = flow
            .login(&AuthFlowState::Anonymous, "nobody@example.com", "pw", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_two_factor_holds_no_token() {
        let mut api = MockCustomerApi::new();
        api.expect_login().returning(|_, _, _| {
            Ok(LoginStep::TwoFactorRequired {
                customer_id: CustomerId::new(7),
                setup: None,
            })
        });
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);

        let step = flow
            .login(&AuthFlowState::Anonymous, "sara@example.com", "pw", Some("/account"))
            .await
            .unwrap();
        let Step::Continue(state) = step else {
            panic!("expected a pending state");
        };
        assert_eq!(state.name(), "two_factor_pending");
        assert!(state.session().is_none());
    }

    #[tokio::test]
    async fn test_login_rejected_while_authenticated() {
        let api = MockCustomerApi::new();
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);

        let err = flow
            .login(&AuthFlowState::Authenticated(signed_in()), "a@b.com", "pw", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidTransition { .. }));
    }

    fn abandoned(name: &str) -> AuthFlowState {
        let return_to = "/checkout".to_string();
        match name {
            "verification_pending" => AuthFlowState::VerificationPending {
                email: Email::parse("new@example.com").unwrap(),
                return_to,
            },
            "two_factor_setup_offered" => AuthFlowState::TwoFactorSetupOffered {
                session: signed_in(),
                return_to,
            },
            "two_factor_setup_pending" => AuthFlowState::TwoFactorSetupPending {
                session: signed_in(),
                pending: PendingTwoFactor::challenge(CustomerId::new(7)),
                return_to,
            },
            "request_pending" => AuthFlowState::RequestPending {
                email: Email::parse("new@example.com").unwrap(),
            },
            _ => AuthFlowState::TwoFactorPending {
                pending: PendingTwoFactor::challenge(CustomerId::new(7)),
                return_to,
            },
        }
    }

    #[rstest]
    #[case("verification_pending")]
    #[case("two_factor_setup_offered")]
    #[case("two_factor_setup_pending")]
    #[case("request_pending")]
    #[case("two_factor_pending")]
    #[tokio::test]
    async fn test_login_replaces_abandoned_flow(#[case] name: &str) {
        let mut api = MockCustomerApi::new();
        api.expect_login()
            .times(1)
            .returning(|_, _, _| Ok(LoginStep::Authenticated(success())));
        let tenant = tenant();
        let state = abandoned(name);
        assert_eq!(state.name(), name);

        let step = AuthFlow::new(&api, &tenant)
            .login(&state, "sara@example.com", "pw", None)
            .await
            .unwrap();
        assert_eq!(
            step,
            Step::LoggedIn {
                session: signed_in(),
                return_to: "/".to_string()
            }
        );
    }

    #[rstest]
    #[case("two_factor_setup_offered")]
    #[case("request_pending")]
    #[tokio::test]
    async fn test_signup_replaces_abandoned_flow(#[case] name: &str) {
        let mut api = MockCustomerApi::new();
        api.expect_signup()
            .times(1)
            .returning(|_, _| Ok(SignupStep::VerificationSent));
        let tenant = tenant();

        let step = AuthFlow::new(&api, &tenant)
            .signup(
                &abandoned(name),
                SignupProfile {
                    name: "Lina".to_string(),
                    email: "lina@example.com".to_string(),
                    password: "long-enough-pw".to_string(),
                    phone: None,
                },
                None,
            )
            .await
            .unwrap();
        let Step::Continue(next) = step else {
            panic!("expected verification");
        };
        assert_eq!(next.name(), "verification_pending");
        assert!(next.session().is_none());
    }

    #[tokio::test]
    async fn test_submit_two_factor() {
        let mut api = MockCustomerApi::new();
        api.expect_verify_two_factor_login()
            .withf(|_, id, code| *id == CustomerId::new(7) && code.as_str() == "123456")
            .times(1)
            .returning(|_, _, _| Ok(success()));
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);
        let state = AuthFlowState::TwoFactorPending {
            pending: PendingTwoFactor::challenge(CustomerId::new(7)),
            return_to: "/account".to_string(),
        };

        let step = flow.submit_two_factor(&state, "123 456").await.unwrap();
        assert!(matches!(step, Step::LoggedIn { ref return_to, .. } if return_to == "/account"));
    }

    #[rstest]
    #[case("12345")]
    #[case("abcdef")]
    #[tokio::test]
    async fn test_submit_two_factor_malformed_code(#[case] code: &str) {
        let mut api = MockCustomerApi::new();
        api.expect_verify_two_factor_login().times(0);
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);
        let state = AuthFlowState::TwoFactorPending {
            pending: PendingTwoFactor::challenge(CustomerId::new(7)),
            return_to: "/".to_string(),
        };

        let err = flow.submit_two_factor(&state, code).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCode(_)));
    }

    #[tokio::test]
    async fn test_signup_branches() {
        let tenant = tenant();
        let profile = || SignupProfile {
            name: " Sara ".to_string(),
            email: "sara@example.com".to_string(),
            password: "long-enough-pw".to_string(),
            phone: Some("  ".to_string()),
        };

        let mut api = MockCustomerApi::new();
        api.expect_signup()
            .withf(|_, req| req.name == "Sara" && req.phone.is_none())
            .returning(|_, _| Ok(SignupStep::ApprovalRequired));
        let step = AuthFlow::new(&api, &tenant)
            .signup(&AuthFlowState::Anonymous, profile(), None)
            .await
            .unwrap();
        assert!(matches!(
            step,
            Step::Continue(AuthFlowState::RequestPending { .. })
        ));

        let mut api = MockCustomerApi::new();
        api.expect_signup()
            .returning(|_, _| Ok(SignupStep::VerificationSent));
        let step = AuthFlow::new(&api, &tenant)
            .signup(&AuthFlowState::Anonymous, profile(), Some("/checkout"))
            .await
            .unwrap();
        assert!(matches!(
            step,
            Step::Continue(AuthFlowState::VerificationPending { ref return_to, .. }) if return_to == "/checkout"
        ));

        let mut api = MockCustomerApi::new();
        api.expect_signup()
            .returning(|_, _| Ok(SignupStep::Authenticated(success())));
        let step = AuthFlow::new(&api, &tenant)
            .signup(&AuthFlowState::Anonymous, profile(), None)
            .await
            .unwrap();
        assert!(matches!(step, Step::LoggedIn { .. }));
    }

    #[tokio::test]
    async fn test_signup_weak_password() {
        let mut api = MockCustomerApi::new();
        api.expect_signup().times(0);
        let tenant = tenant();
        let err = AuthFlow::new(&api, &tenant)
            .signup(
                &AuthFlowState::Anonymous,
                SignupProfile {
                    name: "Sara".to_string(),
                    email: "sara@example.com".to_string(),
                    password: "short".to_string(),
                    phone: None,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_verify_email_offers_setup() {
        let email = Email::parse("sara@example.com").unwrap();
        let mut api = MockCustomerApi::new();
        api.expect_verify_email()
            .with(eq(tenant()), eq(email.clone()), eq(OtpCode::parse("654321").unwrap()))
            .returning(|_, _, _| Ok(success()));
        let tenant = tenant();
        let state = AuthFlowState::VerificationPending {
            email,
            return_to: "/".to_string(),
        };

        let step = AuthFlow::new(&api, &tenant)
            .verify_email(&state, "654321")
            .await
            .unwrap();
        let Step::Continue(next) = step else {
            panic!("expected setup offer");
        };
        assert_eq!(next.name(), "two_factor_setup_offered");
    }

    #[tokio::test]
    async fn test_verify_email_wrong_code_keeps_state() {
        let mut api = MockCustomerApi::new();
        api.expect_verify_email().returning(|_, _, _| {
            Err(ApiError::Rejected {
                status: 422,
                message: "Invalid code".to_string(),
            })
        });
        let tenant = tenant();
        let state = AuthFlowState::VerificationPending {
            email: Email::parse("sara@example.com").unwrap(),
            return_to: "/".to_string(),
        };

        let err = AuthFlow::new(&api, &tenant)
            .verify_email(&state, "000000")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert_eq!(state.name(), "verification_pending");
    }

    #[tokio::test]
    async fn test_resend_only_while_verifying() {
        let mut api = MockCustomerApi::new();
        api.expect_resend_verification_code()
            .times(1)
            .returning(|_, _| Ok(()));
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);

        let verifying = AuthFlowState::VerificationPending {
            email: Email::parse("sara@example.com").unwrap(),
            return_to: "/".to_string(),
        };
        flow.resend_verification_code(&verifying).await.unwrap();
        assert!(matches!(
            flow.resend_verification_code(&AuthFlowState::Anonymous)
                .await
                .unwrap_err(),
            AuthError::InvalidTransition { .. }
        ));
    }

    #[tokio::test]
    async fn test_two_factor_setup_round() {
        let mut api = MockCustomerApi::new();
        api.expect_setup_two_factor().times(1).returning(|_, _| {
            Ok(TwoFactorSetup {
                secret: "JBSWY3DP".to_string(),
                qr_code: "data:image/png;base64,AA".to_string(),
            })
        });
        api.expect_enable_two_factor()
            .times(1)
            .returning(|_, _, _| Ok(vec!["r1".to_string(), "r2".to_string()]));
        let tenant = tenant();
        let flow = AuthFlow::new(&api, &tenant);

        let offered = AuthFlowState::TwoFactorSetupOffered {
            session: signed_in(),
            return_to: "/account".to_string(),
        };
        let Step::Continue(pending) = flow.begin_two_factor_setup(&offered).await.unwrap() else {
            panic!("expected setup pending");
        };
        assert_eq!(
            pending.view().two_factor_setup.unwrap().secret,
            "JBSWY3DP"
        );

        let (step, codes) = flow
            .confirm_two_factor_setup(&pending, "111111")
            .await
            .unwrap();
        assert_eq!(codes, vec!["r1", "r2"]);
        assert!(matches!(step, Step::LoggedIn { ref return_to, .. } if return_to == "/account"));
    }

    #[test]
    fn test_skip_two_factor_setup() {
        let offered = AuthFlowState::TwoFactorSetupOffered {
            session: signed_in(),
            return_to: "/".to_string(),
        };
        assert!(matches!(
            skip_two_factor_setup(&offered).unwrap(),
            Step::LoggedIn { .. }
        ));
        assert!(skip_two_factor_setup(&AuthFlowState::Anonymous).is_err());
    }

    #[test]
    fn test_cancel_discards_pending() {
        assert_eq!(cancel(), AuthFlowState::Anonymous);
    }
}
