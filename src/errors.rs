use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::Serialize;

/// ApiError
///
/// The single error surface every handler and the auth middleware return.
/// Each variant carries a stable status code and a caller-safe message;
/// internal detail (exact token rejection reason, database errors) is logged
/// at the point of failure and never echoed to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Protected route called without any bearer credential.
    #[error("authorization token is not provided")]
    MissingCredential,
    /// Credential present but failed verification. The underlying rejection
    /// reason (malformed / bad signature / expired) is logged, not echoed.
    #[error("token is invalid")]
    InvalidToken,
    /// Login failed. Unknown email and wrong password share one message so the
    /// endpoint cannot be used to probe which accounts exist.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// The OTP provider did not approve the submitted code.
    #[error("verification code was not accepted")]
    OtpRejected,
    /// Authenticated, but the caller's role does not satisfy the operation.
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    /// The OTP provider could not be reached or returned an error.
    #[error("verification service unavailable")]
    OtpUnavailable,
    /// A handler ran without a propagated identity. This is a pipeline contract
    /// violation (route misclassified as public), not a normal runtime path.
    #[error("internal server error")]
    IdentityMissing,
    #[error("internal server error")]
    Internal,
}

/// ErrorBody
///
/// The stable JSON shape every rejection is rendered as, so clients can
/// distinguish "not logged in" from "forbidden" from "validation failed"
/// without parsing free-form text.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential
            | ApiError::InvalidToken
            | ApiError::InvalidCredentials
            | ApiError::OtpRejected => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::OtpUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::IdentityMissing | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn class(&self) -> &'static str {
        match self {
            ApiError::MissingCredential
            | ApiError::InvalidToken
            | ApiError::InvalidCredentials
            | ApiError::OtpRejected => "Unauthenticated",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::Validation(_) => "Invalid Fields",
            ApiError::NotFound(_) => "Not Found",
            ApiError::Conflict(_) => "Conflict",
            ApiError::OtpUnavailable => "Bad Gateway",
            ApiError::IdentityMissing | ApiError::Internal => "Internal Server Error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::IdentityMissing) {
            // A handler expected a verified identity and found none. Surfacing
            // this loudly during testing is the point; it must never be
            // mistaken for an ordinary authentication failure.
            tracing::error!("request reached a protected handler without a propagated identity");
        }

        let body = ErrorBody {
            error: self.class(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_stable() {
        assert_eq!(ApiError::MissingCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("admin only").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::IdentityMissing.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_failures_share_one_external_message() {
        // The wire message must not reveal why the token was rejected.
        assert_eq!(ApiError::InvalidToken.to_string(), "token is invalid");
    }
}
