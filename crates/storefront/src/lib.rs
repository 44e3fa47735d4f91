//! Kawn storefront library.
//!
//! Multi-tenant customer storefront: resolves the store from the request
//! host, drives customer authentication against the Kawn backend and serves
//! site configuration and content pages.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, routing::get};
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Build the application router.
///
/// Rate limiting keys on the client IP, so it needs either proxy headers or
/// `ConnectInfo`. Disable it when driving the router without a socket.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>, rate_limit: bool) -> Router
where
    S: SessionStore + Clone,
{
    let (auth, content) = if rate_limit {
        (
            routes::auth_routes().layer(middleware::auth_rate_limiter()),
            routes::content_routes().layer(middleware::api_rate_limiter()),
        )
    } else {
        (routes::auth_routes(), routes::content_routes())
    };

    Router::new()
        .route("/health", get(routes::health))
        .route("/health/ready", get(routes::readiness))
        .nest("/api/auth", auth)
        .nest("/api", content)
        .layer(sessions)
        .with_state(state)
}
