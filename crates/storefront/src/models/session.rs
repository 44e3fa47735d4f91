//! Session-related types.
//!
//! Types stored in the session for authentication state.

use core::fmt;

use kawn_core::CustomerId;
use serde::{Deserialize, Serialize};

use crate::api::{AuthSuccess, Customer};

/// Customer bearer token issued by the backend.
///
/// `Debug` is redacted so tokens never reach logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token, for `Authorization` headers only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Session-stored customer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    /// Store the account belongs to.
    pub tenant_subdomain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl From<Customer> for CurrentCustomer {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name,
            email: customer.email,
            tenant_subdomain: customer.tenant_subdomain,
            permissions: customer.permissions,
        }
    }
}

/// An authenticated customer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSession {
    pub token: SessionToken,
    pub customer: CurrentCustomer,
    pub is_employee: bool,
}

impl From<AuthSuccess> for CustomerSession {
    fn from(success: AuthSuccess) -> Self {
        Self {
            token: success.token,
            customer: success.customer.into(),
            is_employee: success.is_employee,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Customer bearer token.
    pub const CUSTOMER_TOKEN: &str = "customer_token";

    /// Serialized [`super::CurrentCustomer`].
    pub const CUSTOMER_DATA: &str = "customer_data";

    /// Dashboard token, written for employee logins only.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Serialized auth flow state.
    pub const AUTH_FLOW: &str = "auth_flow";
}
