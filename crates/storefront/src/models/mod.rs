//! Domain models for storefront.

pub mod session;

pub use session::{CurrentCustomer, CustomerSession, SessionToken, keys};
