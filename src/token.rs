use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

/// Role
///
/// The two roles a session token can assert. Comparison is exact enum equality
/// everywhere in the codebase: `Admin` does not implicitly satisfy a
/// `User`-only check and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Exact-match parse from the stored role column. Anything else is rejected.
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims
///
/// The payload carried inside a session token. The signature covers all fields
/// jointly; mutating any of them invalidates the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the authenticated identity, keyed by email.
    pub sub: String,
    /// The role the subject held when the token was issued.
    pub role: Role,
    /// Expiration time (exp): seconds since the Unix epoch. A token is expired
    /// once `now >= exp`.
    pub exp: usize,
    /// Issued at (iat): seconds since the Unix epoch.
    pub iat: usize,
}

/// TokenRejection
///
/// The three distinct reasons `verify` can refuse a token. Callers collapse all
/// of them into a single 401 for the wire; the specific reason is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token is expired")]
    Expired,
}

/// TokenManager
///
/// Creates and verifies signed session tokens. Constructed once from the loaded
/// configuration and shared read-only across all in-flight requests; issuance
/// and verification are pure computation over the immutable keys.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn from_hours(secret: &str, hours: u64) -> Self {
        Self::new(secret, Duration::from_secs(hours * 3600))
    }

    /// issue
    ///
    /// Signs a new session token for the given identity. `exp = now + lifetime`.
    /// The only failure mode is the signing primitive itself, which callers
    /// treat as an internal error.
    pub fn issue(&self, email: &str, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let now = unix_now();
        let claims = Claims {
            sub: email.to_string(),
            role,
            exp: (now + self.lifetime.as_secs()) as usize,
            iat: now as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// verify
    ///
    /// Parses and verifies a token string, producing the decoded claim set or
    /// one of exactly three rejection reasons. Role and subject semantics are
    /// the caller's concern; this layer checks structure, signature, and expiry
    /// only.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenRejection> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // No grace window: the expiry boundary must be deterministic.
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                // Everything else is a structural failure: bad segment count,
                // bad base64, claims that do not deserialize, wrong algorithm.
                _ => TokenRejection::Malformed,
            })?;

        // The library treats `exp == now` as still-valid; the contract here is
        // "expired when now >= exp", so re-check the boundary explicitly.
        if (token_data.claims.exp as u64) <= unix_now() {
            return Err(TokenRejection::Expired);
        }

        Ok(token_data.claims)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}
