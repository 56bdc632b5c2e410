use crate::models::{OwnerDetails, OwnerDetailsRequest, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers interact
/// with the data layer through this trait only, which keeps them testable
/// against an in-memory mock and keeps the Postgres detail out of the request
/// path.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    // Lookups are keyed uniquely by email (the token subject) or phone (the
    // OTP flow's key).
    async fn find_user_by_email(&self, email: &str) -> Option<User>;
    async fn find_user_by_phone(&self, phone: &str) -> Option<User>;
    // Returns None when the insert fails (duplicate email/phone included).
    async fn create_user(&self, user: User) -> Option<User>;

    // --- Owner details (one row per user) ---
    async fn get_owner_details(&self, user_id: Uuid) -> Option<OwnerDetails>;
    async fn create_owner_details(
        &self,
        user_id: Uuid,
        req: OwnerDetailsRequest,
    ) -> Option<OwnerDetails>;
    async fn update_owner_details(
        &self,
        user_id: Uuid,
        req: OwnerDetailsRequest,
    ) -> Option<OwnerDetails>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the app state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
///
/// Expected schema:
/// - `users(id uuid pk, name text, email text unique, phone text unique,
///    role text, password_hash text, created_at timestamptz default now())`
/// - `owner_details(user_id uuid pk references users, account_number text,
///    ifsc_code text, bank_name text, branch_name text, pan_number text,
///    gst_number text, aadhaar_number text)`
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, phone, role, password_hash, created_at";
const DETAIL_COLUMNS: &str =
    "user_id, account_number, ifsc_code, bank_name, branch_name, pan_number, gst_number, aadhaar_number";

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_user_by_email error: {:?}", e);
            None
        })
    }

    async fn find_user_by_phone(&self, phone: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_user_by_phone error: {:?}", e);
            None
        })
    }

    /// create_user
    ///
    /// Inserts a new account row. Unique violations (email or phone already
    /// registered) surface as `None`; the handler has already checked for an
    /// existing account, so a conflict here is a concurrent registration race
    /// and is reported the same way.
    async fn create_user(&self, user: User) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, phone, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.role)
        .bind(&user.password_hash)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    async fn get_owner_details(&self, user_id: Uuid) -> Option<OwnerDetails> {
        sqlx::query_as::<_, OwnerDetails>(&format!(
            "SELECT {DETAIL_COLUMNS} FROM owner_details WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_owner_details error: {:?}", e);
            None
        })
    }

    async fn create_owner_details(
        &self,
        user_id: Uuid,
        req: OwnerDetailsRequest,
    ) -> Option<OwnerDetails> {
        sqlx::query_as::<_, OwnerDetails>(&format!(
            "INSERT INTO owner_details \
             (user_id, account_number, ifsc_code, bank_name, branch_name, pan_number, gst_number, aadhaar_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {DETAIL_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&req.account_number)
        .bind(&req.ifsc_code)
        .bind(&req.bank_name)
        .bind(&req.branch_name)
        .bind(&req.pan_number)
        .bind(&req.gst_number)
        .bind(&req.aadhaar_number)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_owner_details error: {:?}", e);
            None
        })
    }

    /// update_owner_details
    ///
    /// Full replacement of the row. Returns `None` when no row exists for the
    /// user, which the handler reports as 404.
    async fn update_owner_details(
        &self,
        user_id: Uuid,
        req: OwnerDetailsRequest,
    ) -> Option<OwnerDetails> {
        sqlx::query_as::<_, OwnerDetails>(&format!(
            "UPDATE owner_details SET \
             account_number = $2, ifsc_code = $3, bank_name = $4, branch_name = $5, \
             pan_number = $6, gst_number = $7, aadhaar_number = $8 \
             WHERE user_id = $1 RETURNING {DETAIL_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&req.account_number)
        .bind(&req.ifsc_code)
        .bind(&req.bank_name)
        .bind(&req.branch_name)
        .bind(&req.pan_number)
        .bind(&req.gst_number)
        .bind(&req.aadhaar_number)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_owner_details error: {:?}", e);
            None
        })
    }
}
