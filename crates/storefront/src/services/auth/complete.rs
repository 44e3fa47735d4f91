//! Login finalisation.

use kawn_core::{Subdomain, TenantContext, TenantResolver};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::{AuthError, AuthFlowState};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_customer_session, save_auth_flow, set_customer_session};
use crate::models::{CurrentCustomer, CustomerSession};
use crate::services::{CustomerLoginEvent, LoginEvents};

/// Where to send the customer after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Stay on this store.
    Redirect(String),
    /// The account belongs to another store; log in there instead.
    CrossTenantRedirect(String),
}

impl LoginOutcome {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Redirect(url) | Self::CrossTenantRedirect(url) => url,
        }
    }
}

/// Decide where a freshly logged-in customer goes.
///
/// A customer whose account belongs to a different store is sent to that
/// store's login page with the same `returnTo`. The default tenant and its
/// aliases are interchangeable with the bare host.
#[must_use]
pub fn login_outcome(
    resolver: &TenantResolver,
    current: &TenantContext,
    customer: &CurrentCustomer,
    return_to: &str,
) -> LoginOutcome {
    let home = customer
        .tenant_subdomain
        .as_deref()
        .and_then(|s| Subdomain::parse(s).ok())
        .map(|s| resolver.canonicalize(s));

    let Some(home) = home else {
        return LoginOutcome::Redirect(return_to.to_string());
    };

    let same_store = match &current.subdomain {
        Some(browsed) => {
            *browsed == home
                || (resolver.is_default_tenant(browsed) && resolver.is_default_tenant(&home))
        }
        None => resolver.is_default_tenant(&home),
    };
    if same_store {
        return LoginOutcome::Redirect(return_to.to_string());
    }

    let path = format!("/login?returnTo={}", urlencoding::encode(return_to));
    LoginOutcome::CrossTenantRedirect(resolver.store_url(&home, &path, current))
}

/// Finish a login: write the session keys, publish the login event, and
/// pick the redirect.
///
/// On a cross-tenant mismatch nothing is written and the flow resets to
/// `Anonymous`.
///
/// # Errors
///
/// Returns `AuthError::Session` if the session store fails.
#[instrument(skip_all, fields(customer_id = %customer_session.customer.id))]
pub async fn complete(
    session: &Session,
    events: &LoginEvents,
    resolver: &TenantResolver,
    current: &TenantContext,
    customer_session: CustomerSession,
    return_to: &str,
) -> Result<LoginOutcome, AuthError> {
    let outcome = login_outcome(resolver, current, &customer_session.customer, return_to);

    if let LoginOutcome::CrossTenantRedirect(url) = &outcome {
        warn!(
            home = ?customer_session.customer.tenant_subdomain,
            browsed = %current.domain,
            url = %url,
            "Customer belongs to another store"
        );
        save_auth_flow(session, &AuthFlowState::Anonymous).await?;
        return Ok(outcome);
    }

    // Rotate the session ID on privilege change
    session.cycle_id().await?;
    set_customer_session(session, &customer_session).await?;
    save_auth_flow(session, &AuthFlowState::Authenticated(customer_session.clone())).await?;

    let customer = customer_session.customer;
    set_sentry_user(&customer.id, Some(&customer.email));
    info!(is_employee = customer_session.is_employee, "Customer logged in");

    events.publish(CustomerLoginEvent {
        token: customer_session.token,
        permissions: customer.permissions.clone().unwrap_or_default(),
        customer,
        is_employee: customer_session.is_employee,
    });

    Ok(outcome)
}

/// Log out: drop every session key and return to `Anonymous`.
///
/// # Errors
///
/// Returns `AuthError::Session` if the session store fails.
pub async fn logout(session: &Session) -> Result<(), AuthError> {
    clear_customer_session(session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kawn_core::CustomerId;
    use rstest::rstest;

    fn resolver() -> TenantResolver {
        TenantResolver::new(["kawn.com"], "main").with_default_alias("kawn")
    }

    fn customer(tenant: Option<&str>) -> CurrentCustomer {
        CurrentCustomer {
            id: CustomerId::new(1),
            name: "Sara".to_string(),
            email: "sara@example.com".to_string(),
            tenant_subdomain: tenant.map(str::to_string),
            permissions: None,
        }
    }

    #[rstest]
    #[case("shop1.kawn.com", Some("shop1"))]
    #[case("shop1.kawn.com", None)]
    #[case("kawn.com", Some("main"))]
    #[case("kawn.com", Some("kawn"))]
    #[case("main.kawn.com", Some("kawn"))]
    #[case("shop1.kawn.com", Some("not a label"))]
    fn test_same_store_redirects_locally(#[case] host: &str, #[case] tenant: Option<&str>) {
        let r = resolver();
        let outcome = login_outcome(&r, &r.resolve(host), &customer(tenant), "/account");
        assert_eq!(outcome, LoginOutcome::Redirect("/account".to_string()));
    }

    #[rstest]
    #[case("shop1.kawn.com", "shop2", "https://shop2.kawn.com/login?returnTo=%2Faccount")]
    #[case("kawn.com", "shop2", "https://shop2.kawn.com/login?returnTo=%2Faccount")]
    #[case("shop1.kawn.com", "kawn", "https://kawn.kawn.com/login?returnTo=%2Faccount")]
    #[case("shop1.localhost:3000", "shop2", "http://shop2.localhost/login?returnTo=%2Faccount")]
    fn test_cross_tenant_redirect(#[case] host: &str, #[case] tenant: &str, #[case] url: &str) {
        let r = resolver();
        let outcome = login_outcome(&r, &r.resolve(host), &customer(Some(tenant)), "/account");
        assert_eq!(outcome, LoginOutcome::CrossTenantRedirect(url.to_string()));
    }
}
