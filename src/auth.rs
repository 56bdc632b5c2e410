use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{AppState, errors::ApiError, token::Role};

/// AuthUser
///
/// The resolved identity of an authenticated request: the verified claim set
/// reduced to the two fields handlers consume. One instance lives in the
/// request's extensions for the duration of that request and nowhere else;
/// it is never persisted and never visible to concurrent requests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The authenticated identity, keyed by email (the token subject).
    pub email: String,
    /// The role asserted by the token, used for handler-level checks.
    pub role: Role,
}

/// AuthUser Extractor Implementation
///
/// Lets any handler take `AuthUser` as an argument. The extractor only reads
/// the identity that `auth_middleware` propagated into the request extensions;
/// it performs no verification of its own.
///
/// Rejection: if the extension is absent the route was misclassified as public
/// or the gate was bypassed. That is a programming error, and the request fails
/// closed with 500 rather than proceeding with an empty identity.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::IdentityMissing)
    }
}

impl AuthUser {
    /// Handler-level role gate. Exact match only; see `Role`.
    pub fn require_role(&self, required: Role, denial: &'static str) -> Result<(), ApiError> {
        if self.role != required {
            return Err(ApiError::Forbidden(denial));
        }
        Ok(())
    }
}

/// auth_middleware
///
/// The single chokepoint every protected call passes through, applied as a
/// `route_layer` on the protected routers. The sequence per call:
///
/// 1. Extract the bearer credential from the `Authorization` header.
///    Absence (or a missing `Bearer ` prefix) terminates the call with 401.
/// 2. Verify structure, signature, and expiry via the token manager. Any
///    failure terminates the call with a generic 401; the specific rejection
///    reason goes to the log only.
/// 3. Attach the verified identity to the request extensions and dispatch.
///
/// Every rejection is terminal (no retry, no partial dispatch) and happens
/// before the handler executes. Verification is pure computation; nothing is
/// mutated on a rejected call.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::MissingCredential)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::MissingCredential)?;

    let claims = state.tokens.verify(token).map_err(|reason| {
        // Exact reason stays server-side; echoing it would hand an attacker
        // an oracle against the verifier.
        tracing::warn!(%reason, "rejected bearer token");
        ApiError::InvalidToken
    })?;

    request.extensions_mut().insert(AuthUser {
        email: claims.sub,
        role: claims.role,
    });

    Ok(next.run(request).await)
}
