//! Defines the HTTP routes specifically for authentication.
//!
//! Routes that require a live session carry the `jwt_auth` middleware.
//! Login, refresh, logout, and the MFA bridge endpoints sit outside it
//! because they accept tokens that have no session yet; the service
//! verifies those token kinds itself.

use crate::auth::handlers::*;
use crate::auth::middleware::jwt_auth;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/mfa/enable", post(mfa_enable))
        .route("/mfa/verify", post(mfa_verify))
        .route("/me", get(me).layer(middleware::from_fn(jwt_auth)))
        .route(
            "/mfa/disable",
            post(mfa_disable).layer(middleware::from_fn(jwt_auth)),
        )
        .route(
            "/change-password",
            post(change_password).layer(middleware::from_fn(jwt_auth)),
        )
}
