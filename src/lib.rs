use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod otp;
pub mod repository;
pub mod security;
pub mod token;

// Module for routing segregation (Public, Authenticated, Owner, OTP).
pub mod routes;

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point.
pub use config::AppConfig;
pub use otp::{MockOtpService, OtpState, TwilioVerifyClient};
pub use repository::{PostgresRepository, RepositoryState};
pub use token::TokenManager;

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the service,
/// aggregating every annotated handler and schema. Served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::authenticate_user,
        handlers::send_otp, handlers::verify_otp,
        handlers::get_me,
        handlers::get_owner_details, handlers::add_owner_details,
        handlers::update_owner_details,
    ),
    components(
        schemas(
            models::RegisterRequest, models::LoginRequest,
            models::OtpSendRequest, models::OtpVerifyRequest,
            models::OwnerDetailsRequest, models::OwnerDetails,
            models::UserProfile, models::AuthResponse, models::MessageResponse,
        )
    ),
    tags(
        (name = "account-portal", description = "User Account Service API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container holding every shared service: persistence,
/// the OTP collaborator, the token manager, and the loaded configuration.
/// Cloned per request by axum; all contents are read-only after startup, so
/// concurrent requests share them without synchronization.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: account and owner-detail persistence.
    pub repo: RepositoryState,
    /// Phone verification collaborator.
    pub otp: OtpState,
    /// Session token codec, built once from the signing secret and lifetime.
    pub tokens: TokenManager,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and middleware to pull individual components out of the
// shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for OtpState {
    fn from_ref(app_state: &AppState) -> OtpState {
        app_state.otp.clone()
    }
}

impl FromRef<AppState> for TokenManager {
    fn from_ref(app_state: &AppState) -> TokenManager {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure. This is where the
/// route policy lives: the public router carries exactly the operations that
/// bypass authentication, everything else sits behind `auth_middleware` as a
/// route layer, and the OTP routes land on one side or the other according to
/// `AppConfig::otp_requires_auth`. The table is fixed once this function
/// returns.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Route Policy Assembly
    let mut public = routes::public::public_routes();
    let mut protected = routes::authenticated::authenticated_routes()
        .nest("/owner", routes::owner::owner_routes());

    if state.config.otp_requires_auth {
        protected = protected.merge(routes::otp::otp_routes());
    } else {
        public = public.merge(routes::otp::otp_routes());
    }

    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public)
        // Protected routes: every call passes through the auth middleware
        // before any handler executes. Role checks stay inside the handlers.
        .merge(protected.route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        )))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID generation: a unique UUID for every incoming call.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request tracing: one span per request, carrying the ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the generated x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: includes the HTTP method, URI, and the
/// `x-request-id` header so every log line for one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
