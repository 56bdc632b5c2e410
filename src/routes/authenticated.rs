use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes open to any caller who passed the auth middleware, regardless of
/// role. Handlers here read the propagated identity but apply no role gate.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /me
        // The caller's own account record, resolved from the token subject.
        .route("/me", get(handlers::get_me))
}
