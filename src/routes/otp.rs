use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// OTP Router Module
///
/// Phone verification: deliver a passcode and check one. Whether these routes
/// require authentication is a deployment decision
/// (`AppConfig::otp_requires_auth`); `create_router` merges this router into
/// the public or the protected set accordingly, so the policy is fixed at
/// startup and visible in one place.
pub fn otp_routes() -> Router<AppState> {
    Router::new()
        // POST /otp/send: deliver a passcode to a registered phone.
        .route("/otp/send", post(handlers::send_otp))
        // POST /otp/verify: check a passcode; approval opens a session.
        .route("/otp/verify", post(handlers::verify_otp))
}
