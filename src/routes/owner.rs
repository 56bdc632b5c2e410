use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Owner Details Router Module
///
/// Bank/tax detail management. The router itself only guarantees the caller is
/// authenticated (it is mounted behind the auth middleware); every handler
/// additionally requires the admin role and returns 403 otherwise. Keeping the
/// role check in the handler matches the rest of the service, where different
/// protected operations carry different role requirements.
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        // GET /owner/details: fetch the caller's owner-detail record.
        // POST /owner/details: create it (409 if it already exists).
        // PUT /owner/details: replace it (404 if it was never created).
        .route(
            "/details",
            get(handlers::get_owner_details)
                .post(handlers::add_owner_details)
                .put(handlers::update_owner_details),
        )
}
