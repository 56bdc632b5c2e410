use account_portal::{
    AppConfig, AppState, TokenManager,
    auth::AuthUser,
    handlers,
    models::{OwnerDetails, OwnerDetailsRequest, RegisterRequest, User},
    otp::MockOtpService,
    repository::Repository,
    security,
    token::Role,
};
use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::StatusCode,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use uuid::Uuid;

// --- Controllable Repository Mock ---

/// Repository mock with per-test knobs: which user exists, whether details
/// exist, and whether the insert path should simulate a lost uniqueness race.
#[derive(Default)]
struct ControlRepo {
    user: Option<User>,
    details: Option<OwnerDetails>,
    create_user_fails: bool,
    create_details_called: AtomicBool,
}

#[async_trait]
impl Repository for ControlRepo {
    async fn find_user_by_email(&self, _email: &str) -> Option<User> {
        self.user.clone()
    }
    async fn find_user_by_phone(&self, _phone: &str) -> Option<User> {
        self.user.clone()
    }
    async fn create_user(&self, user: User) -> Option<User> {
        if self.create_user_fails {
            None
        } else {
            Some(user)
        }
    }
    async fn get_owner_details(&self, _user_id: Uuid) -> Option<OwnerDetails> {
        self.details.clone()
    }
    async fn create_owner_details(
        &self,
        user_id: Uuid,
        req: OwnerDetailsRequest,
    ) -> Option<OwnerDetails> {
        self.create_details_called.store(true, Ordering::SeqCst);
        Some(echo_details(user_id, req))
    }
    async fn update_owner_details(
        &self,
        user_id: Uuid,
        req: OwnerDetailsRequest,
    ) -> Option<OwnerDetails> {
        self.details.as_ref()?;
        Some(echo_details(user_id, req))
    }
}

fn echo_details(user_id: Uuid, req: OwnerDetailsRequest) -> OwnerDetails {
    OwnerDetails {
        user_id,
        account_number: req.account_number,
        ifsc_code: req.ifsc_code,
        bank_name: req.bank_name,
        branch_name: req.branch_name,
        pan_number: req.pan_number,
        gst_number: req.gst_number,
        aadhaar_number: req.aadhaar_number,
    }
}

// --- Fixtures ---

fn build_state(repo: Arc<ControlRepo>, otp: MockOtpService) -> AppState {
    let config = AppConfig::default();
    let tokens = TokenManager::from_hours(&config.jwt_secret, config.token_lifetime_hours);
    AppState {
        repo,
        otp: Arc::new(otp),
        tokens,
        config,
    }
}

fn stored_user(email: &str, role: &str, password: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: "Stored User".to_string(),
        email: email.to_string(),
        phone: "9876543210".to_string(),
        role: role.to_string(),
        password_hash: security::hash_password(password).unwrap(),
        created_at: Default::default(),
    }
}

fn register_request() -> RegisterRequest {
    RegisterRequest {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "hunter22".to_string(),
        phone: "9876543210".to_string(),
        role: "user".to_string(),
    }
}

fn details_request() -> OwnerDetailsRequest {
    OwnerDetailsRequest {
        account_number: "123456789012".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
        bank_name: "HDFC".to_string(),
        branch_name: "Main".to_string(),
        pan_number: "ABCDE1234F".to_string(),
        gst_number: "22AAAAA0000A1Z5".to_string(),
        aadhaar_number: "123412341234".to_string(),
    }
}

fn caller(email: &str, role: Role) -> AuthUser {
    AuthUser {
        email: email.to_string(),
        role,
    }
}

// --- Registration ---

#[tokio::test]
async fn register_creates_account_and_opens_session() {
    let state = build_state(Arc::new(ControlRepo::default()), MockOtpService::new());

    let (status, Json(response)) =
        handlers::register_user(State(state.clone()), Json(register_request()))
            .await
            .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response.user.email, "alice@example.com");
    assert_eq!(response.user.role, "user");

    // The returned token must verify against the same codec and carry the
    // new account's identity.
    let claims = state.tokens.verify(&response.token).unwrap();
    assert_eq!(claims.sub, "alice@example.com");
    assert_eq!(claims.role, Role::User);
}

#[tokio::test]
async fn register_duplicate_email_conflicts() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let err = handlers::register_user(State(state), Json(register_request()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_rejects_invalid_fields() {
    let state = build_state(Arc::new(ControlRepo::default()), MockOtpService::new());

    let mut request = register_request();
    request.phone = "12345".to_string();

    let err = handlers::register_user(State(state), Json(request))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_reports_lost_insert_race_as_conflict() {
    let repo = Arc::new(ControlRepo {
        create_user_fails: true,
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let err = handlers::register_user(State(state), Json(register_request()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

// --- Password Login ---

#[tokio::test]
async fn login_succeeds_with_correct_password() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("root@example.com", "admin", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let Json(response) = handlers::authenticate_user(
        State(state.clone()),
        Json(account_portal::models::LoginRequest {
            email: "root@example.com".to_string(),
            password: "hunter22".to_string(),
        }),
    )
    .await
    .unwrap();

    let claims = state.tokens.verify(&response.token).unwrap();
    assert_eq!(claims.sub, "root@example.com");
    assert_eq!(claims.role, Role::Admin);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    // Wrong password against an existing account.
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());
    let wrong_password = handlers::authenticate_user(
        State(state),
        Json(account_portal::models::LoginRequest {
            email: "alice@example.com".to_string(),
            password: "not-the-password".to_string(),
        }),
    )
    .await
    .unwrap_err();

    // Unknown account entirely.
    let state = build_state(Arc::new(ControlRepo::default()), MockOtpService::new());
    let unknown_email = handlers::authenticate_user(
        State(state),
        Json(account_portal::models::LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "hunter22".to_string(),
        }),
    )
    .await
    .unwrap_err();

    // Same status, same message: the endpoint must not leak which accounts
    // exist.
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

// --- Phone Verification ---

#[tokio::test]
async fn send_otp_delivers_for_registered_phone() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let Json(response) = handlers::send_otp(
        State(state),
        Json(account_portal::models::OtpSendRequest {
            phone: "9876543210".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(response.message, "Verification code sent");
}

#[tokio::test]
async fn send_otp_provider_failure_is_bad_gateway() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new_failing());

    let err = handlers::send_otp(
        State(state),
        Json(account_portal::models::OtpSendRequest {
            phone: "9876543210".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn verify_otp_approval_opens_session() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let Json(response) = handlers::verify_otp(
        State(state.clone()),
        Json(account_portal::models::OtpVerifyRequest {
            phone: "9876543210".to_string(),
            code: "123456".to_string(),
        }),
    )
    .await
    .unwrap();

    let claims = state.tokens.verify(&response.token).unwrap();
    assert_eq!(claims.sub, "alice@example.com");
}

#[tokio::test]
async fn verify_otp_wrong_code_is_unauthorized() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let err = handlers::verify_otp(
        State(state),
        Json(account_portal::models::OtpVerifyRequest {
            phone: "9876543210".to_string(),
            code: "000000".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verify_otp_unregistered_phone_is_not_found() {
    let state = build_state(Arc::new(ControlRepo::default()), MockOtpService::new());

    let err = handlers::verify_otp(
        State(state),
        Json(account_portal::models::OtpVerifyRequest {
            phone: "9876543210".to_string(),
            code: "123456".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// --- Profile ---

#[tokio::test]
async fn get_me_returns_the_callers_profile() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let Json(profile) = handlers::get_me(caller("alice@example.com", Role::User), State(state))
        .await
        .unwrap();
    assert_eq!(profile.email, "alice@example.com");
}

#[tokio::test]
async fn get_me_for_deleted_account_is_not_found() {
    let state = build_state(Arc::new(ControlRepo::default()), MockOtpService::new());

    let err = handlers::get_me(caller("ghost@example.com", Role::User), State(state))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// --- Owner Details (admin-gated) ---

#[tokio::test]
async fn add_owner_details_as_admin_creates_the_record() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("root@example.com", "admin", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let (status, Json(details)) = handlers::add_owner_details(
        caller("root@example.com", Role::Admin),
        State(state),
        Json(details_request()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(details.ifsc_code, "HDFC0001234");
}

#[tokio::test]
async fn add_owner_details_as_user_is_forbidden_without_writes() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo.clone(), MockOtpService::new());

    let err = handlers::add_owner_details(
        caller("alice@example.com", Role::User),
        State(state),
        Json(details_request()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert!(!repo.create_details_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn add_owner_details_twice_conflicts() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("root@example.com", "admin", "hunter22")),
        details: Some(OwnerDetails::default()),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let err = handlers::add_owner_details(
        caller("root@example.com", Role::Admin),
        State(state),
        Json(details_request()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn add_owner_details_rejects_malformed_identifiers() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("root@example.com", "admin", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo.clone(), MockOtpService::new());

    let mut payload = details_request();
    payload.aadhaar_number = "1234".to_string();

    let err = handlers::add_owner_details(
        caller("root@example.com", Role::Admin),
        State(state),
        Json(payload),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(!repo.create_details_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn update_owner_details_replaces_an_existing_record() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("root@example.com", "admin", "hunter22")),
        details: Some(OwnerDetails::default()),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let mut payload = details_request();
    payload.bank_name = "ICICI".to_string();

    let Json(details) = handlers::update_owner_details(
        caller("root@example.com", Role::Admin),
        State(state),
        Json(payload),
    )
    .await
    .unwrap();
    assert_eq!(details.bank_name, "ICICI");
}

#[tokio::test]
async fn update_owner_details_without_a_record_is_not_found() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("root@example.com", "admin", "hunter22")),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let err = handlers::update_owner_details(
        caller("root@example.com", Role::Admin),
        State(state),
        Json(details_request()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_owner_details_as_user_is_forbidden() {
    let repo = Arc::new(ControlRepo {
        user: Some(stored_user("alice@example.com", "user", "hunter22")),
        details: Some(OwnerDetails::default()),
        ..Default::default()
    });
    let state = build_state(repo, MockOtpService::new());

    let err = handlers::get_owner_details(caller("alice@example.com", Role::User), State(state))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

// --- Identity Propagation Fail-Closed ---

#[tokio::test]
async fn identity_extractor_fails_closed_outside_the_pipeline() {
    // A request that never went through the auth layer carries no identity
    // extension. Extraction must fail as a server error, not fabricate a
    // caller.
    let request = axum::http::Request::builder()
        .uri("/owner/details")
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();

    let err = AuthUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
