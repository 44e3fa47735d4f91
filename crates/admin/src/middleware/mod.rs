//! HTTP middleware for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Body limit on import routes
//!
//! [`MerchantAuth`] runs per handler.

pub mod auth;

pub use auth::{MerchantAuth, MerchantAuthRejection};
