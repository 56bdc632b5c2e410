use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The complete set of operations that bypass authentication: account
/// creation, password authentication, and the health probe. Everything else
/// in the service requires a valid, non-expired session token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitors and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // New account creation. Returns a session token on success.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Password authentication. Returns a session token on success.
        .route("/login", post(handlers::authenticate_user))
}
