use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::token::Role;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record stored in the `users` table. Email and phone
/// are unique keys; `role` holds the raw column value and is parsed into
/// [`Role`] wherever an authorization decision is made.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    // The RBAC column: 'user' or 'admin'.
    pub role: String,
    // Argon2 PHC string. Never serialized, never logged.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The caller-safe projection of an account record.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role.clone(),
        }
    }
}

/// OwnerDetails
///
/// Bank and tax details attached to an account, one row per user. Readable and
/// writable only through admin-gated operations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS, ToSchema, Default)]
#[ts(export)]
pub struct OwnerDetails {
    pub user_id: Uuid,
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: String,
    pub branch_name: String,
    pub pan_number: String,
    pub gst_number: String,
    pub aadhaar_number: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /register).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    /// Requested role, 'user' or 'admin'. Defaults to 'user' when omitted.
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

/// LoginRequest
///
/// Input payload for password authentication (POST /login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// OtpSendRequest
///
/// Requests delivery of a one-time passcode to a registered phone.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OtpSendRequest {
    pub phone: String,
}

/// OtpVerifyRequest
///
/// Submits the passcode the caller received for checking.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OtpVerifyRequest {
    pub phone: String,
    pub code: String,
}

/// OwnerDetailsRequest
///
/// Payload for creating or replacing an account's owner details.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OwnerDetailsRequest {
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: String,
    pub branch_name: String,
    pub pan_number: String,
    pub gst_number: String,
    pub aadhaar_number: String,
}

// --- Response Schemas ---

/// UserProfile
///
/// The caller-facing view of an account. Excludes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}

/// AuthResponse
///
/// Returned by every operation that establishes a session: registration,
/// password login, and OTP verification. The token is the opaque credential
/// the client presents on subsequent calls.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

/// MessageResponse
///
/// Plain acknowledgement body for operations with no data payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

// --- Field Validation ---

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_alphanumeric(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn looks_like_email(s: &str) -> bool {
    s.contains('@') && s.contains('.')
}

/// A phone number is exactly ten ASCII digits.
pub fn validate_phone(phone: &str) -> bool {
    is_digits(phone, 10)
}

impl RegisterRequest {
    /// Checks all registration fields and resolves the requested role.
    /// Runs before any persistence call; invalid input never reaches the
    /// repository.
    pub fn validate(&self) -> Result<Role, &'static str> {
        if self.name.is_empty() || self.password.is_empty() {
            return Err("name and password are required");
        }
        if !looks_like_email(&self.email) {
            return Err("email address is not valid");
        }
        if !validate_phone(&self.phone) {
            return Err("phone number must be exactly 10 digits");
        }
        Role::parse(&self.role).ok_or("role must be 'user' or 'admin'")
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err("email and password are required");
        }
        Ok(())
    }
}

impl OwnerDetailsRequest {
    /// Format checks for the Indian banking/tax identifiers the record carries.
    pub fn validate(&self) -> Result<(), &'static str> {
        let account_ok = (9..=18).contains(&self.account_number.len())
            && self.account_number.bytes().all(|b| b.is_ascii_digit());
        if !account_ok {
            return Err("account number must be 9 to 18 digits");
        }
        if !is_alphanumeric(&self.ifsc_code, 11) {
            return Err("IFSC code must be 11 characters");
        }
        if self.bank_name.is_empty() || self.branch_name.is_empty() {
            return Err("bank and branch names are required");
        }
        if !is_alphanumeric(&self.pan_number, 10) {
            return Err("PAN must be 10 characters");
        }
        if !is_digits(&self.aadhaar_number, 12) {
            return Err("Aadhaar number must be 12 digits");
        }
        if !is_alphanumeric(&self.gst_number, 15) {
            return Err("GSTIN must be 15 characters");
        }
        Ok(())
    }
}
