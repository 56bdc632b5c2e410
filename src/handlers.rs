use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    errors::ApiError,
    models::{
        AuthResponse, LoginRequest, MessageResponse, OtpSendRequest, OtpVerifyRequest,
        OwnerDetails, OwnerDetailsRequest, RegisterRequest, User, UserProfile, validate_phone,
    },
    security,
    token::Role,
};

/// Resolves the stored role column into the typed enum. A row with an
/// unrecognized role is corrupt data, not a caller mistake.
fn stored_role(user: &User) -> Result<Role, ApiError> {
    Role::parse(&user.role).ok_or_else(|| {
        tracing::error!(user = %user.email, role = %user.role, "unrecognized role in users table");
        ApiError::Internal
    })
}

fn issue_session(state: &AppState, email: &str, role: Role) -> Result<String, ApiError> {
    state.tokens.issue(email, role).map_err(|e| {
        // Signing can only fail if the primitive itself fails; there is no
        // recoverable path for the request.
        tracing::error!("token signing failed: {:?}", e);
        ApiError::Internal
    })
}

// --- Public Handlers ---

/// register_user
///
/// [Public Route] Creates a new account and opens a session for it.
/// Duplicate email is a 409; validation failures never reach the repository.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let role = payload.validate().map_err(ApiError::Validation)?;

    if state
        .repo
        .find_user_by_email(&payload.email)
        .await
        .is_some()
    {
        return Err(ApiError::Conflict("user already exists"));
    }

    let password_hash = security::hash_password(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {e}");
        ApiError::Internal
    })?;

    let user = User {
        id: Uuid::new_v4(),
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        role: role.as_str().to_string(),
        password_hash,
        created_at: Utc::now(),
    };

    // A concurrent registration can still win the race between the lookup
    // above and this insert; the unique constraint reports it as None.
    let created = state
        .repo
        .create_user(user)
        .await
        .ok_or(ApiError::Conflict("user already exists"))?;

    let token = issue_session(&state, &created.email, role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user: created.profile(),
        }),
    ))
}

/// authenticate_user
///
/// [Public Route] Password login. Unknown email and wrong password produce the
/// same 401 so the endpoint cannot be used to enumerate accounts.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Authentication failed")
    )
)]
pub async fn authenticate_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let user = state
        .repo
        .find_user_by_email(&payload.email)
        .await
        .ok_or(ApiError::InvalidCredentials)?;

    if !security::verify_password(&user.password_hash, &payload.password) {
        return Err(ApiError::InvalidCredentials);
    }

    let role = stored_role(&user)?;
    let token = issue_session(&state, &user.email, role)?;

    Ok(Json(AuthResponse {
        message: "User authenticated successfully".to_string(),
        token,
        user: user.profile(),
    }))
}

// --- OTP Handlers (public or protected, per configuration) ---

/// send_otp
///
/// Requests passcode delivery for a registered phone. The phone must belong to
/// an existing account; unregistered numbers get a 404 and no delivery.
#[utoipa::path(
    post,
    path = "/otp/send",
    request_body = OtpSendRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Invalid phone"),
        (status = 404, description = "Phone not registered")
    )
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpSendRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !validate_phone(&payload.phone) {
        return Err(ApiError::Validation("phone number must be exactly 10 digits"));
    }

    if state
        .repo
        .find_user_by_phone(&payload.phone)
        .await
        .is_none()
    {
        return Err(ApiError::NotFound("phone number is not registered"));
    }

    state
        .otp
        .send_verification(&payload.phone)
        .await
        .map_err(|e| {
            tracing::error!("otp send failed: {e}");
            ApiError::OtpUnavailable
        })?;

    Ok(Json(MessageResponse {
        message: "Verification code sent".to_string(),
    }))
}

/// verify_otp
///
/// Checks a submitted passcode and, on approval, opens a session for the
/// account that owns the phone number.
#[utoipa::path(
    post,
    path = "/otp/verify",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Phone verified", body = AuthResponse),
        (status = 401, description = "Code not accepted"),
        (status = 404, description = "Phone not registered")
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpVerifyRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !validate_phone(&payload.phone) {
        return Err(ApiError::Validation("phone number must be exactly 10 digits"));
    }
    if payload.code.is_empty() {
        return Err(ApiError::Validation("verification code is required"));
    }

    let user = state
        .repo
        .find_user_by_phone(&payload.phone)
        .await
        .ok_or(ApiError::NotFound("phone number is not registered"))?;

    let approved = state
        .otp
        .check_verification(&payload.phone, &payload.code)
        .await
        .map_err(|e| {
            tracing::error!("otp check failed: {e}");
            ApiError::OtpUnavailable
        })?;

    if !approved {
        return Err(ApiError::OtpRejected);
    }

    let role = stored_role(&user)?;
    let token = issue_session(&state, &user.email, role)?;

    Ok(Json(AuthResponse {
        message: "Phone verified successfully".to_string(),
        token,
        user: user.profile(),
    }))
}

// --- Protected Handlers ---

/// get_me
///
/// [Authenticated Route, any role] Returns the caller's own account record.
/// The identity comes from the propagated claim set; a missing record means
/// the account was deleted after the token was issued.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .find_user_by_email(&auth.email)
        .await
        .ok_or(ApiError::NotFound("user not found"))?;

    Ok(Json(user.profile()))
}

/// get_owner_details
///
/// [Admin Route] Fetches the owner details attached to the caller's account.
/// The role check runs in the handler, after the pipeline authenticated the
/// call; authentication is centralized, authorization is per-operation.
#[utoipa::path(
    get,
    path = "/owner/details",
    responses(
        (status = 200, description = "Owner details", body = OwnerDetails),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_owner_details(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<OwnerDetails>, ApiError> {
    auth.require_role(Role::Admin, "only admin can view owner details")?;

    let user = state
        .repo
        .find_user_by_email(&auth.email)
        .await
        .ok_or(ApiError::NotFound("user not found"))?;

    let details = state
        .repo
        .get_owner_details(user.id)
        .await
        .ok_or(ApiError::NotFound("owner details not found"))?;

    Ok(Json(details))
}

/// add_owner_details
///
/// [Admin Route] Creates the owner-detail record for the caller's account.
/// One record per user; a second create is a 409.
#[utoipa::path(
    post,
    path = "/owner/details",
    request_body = OwnerDetailsRequest,
    responses(
        (status = 201, description = "Created", body = OwnerDetails),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Already exists")
    )
)]
pub async fn add_owner_details(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<OwnerDetailsRequest>,
) -> Result<(StatusCode, Json<OwnerDetails>), ApiError> {
    auth.require_role(Role::Admin, "only admin can add owner details")?;
    payload.validate().map_err(ApiError::Validation)?;

    let user = state
        .repo
        .find_user_by_email(&auth.email)
        .await
        .ok_or(ApiError::NotFound("user not found"))?;

    if state.repo.get_owner_details(user.id).await.is_some() {
        return Err(ApiError::Conflict("owner details already exist"));
    }

    let details = state
        .repo
        .create_owner_details(user.id, payload)
        .await
        .ok_or(ApiError::Conflict("owner details already exist"))?;

    Ok((StatusCode::CREATED, Json(details)))
}

/// update_owner_details
///
/// [Admin Route] Replaces the caller's owner-detail record. Updating a record
/// that was never created is a 404, not an implicit create.
#[utoipa::path(
    put,
    path = "/owner/details",
    request_body = OwnerDetailsRequest,
    responses(
        (status = 200, description = "Updated", body = OwnerDetails),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_owner_details(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<OwnerDetailsRequest>,
) -> Result<Json<OwnerDetails>, ApiError> {
    auth.require_role(Role::Admin, "only admin can update owner details")?;
    payload.validate().map_err(ApiError::Validation)?;

    let user = state
        .repo
        .find_user_by_email(&auth.email)
        .await
        .ok_or(ApiError::NotFound("user not found"))?;

    let details = state
        .repo
        .update_owner_details(user.id, payload)
        .await
        .ok_or(ApiError::NotFound("owner details not found"))?;

    Ok(Json(details))
}
