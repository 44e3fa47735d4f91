//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Customer login, signup, verification and TOTP enrolment
//! - `events` - In-process login notifications

pub mod auth;
pub mod events;

pub use events::{CustomerLoginEvent, LoginEvents};
