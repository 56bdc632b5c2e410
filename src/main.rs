use account_portal::{
    AppState, MockOtpService, PostgresRepository, TokenManager, TwilioVerifyClient,
    config::{AppConfig, Env},
    create_router,
    otp::OtpState,
    repository::RepositoryState,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point: loads configuration, initializes logging,
/// connects to Postgres, wires the collaborators, and serves HTTP.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter setup: RUST_LOG wins, sensible defaults otherwise.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "account_portal=debug,tower_http=info,axum=trace".into());

    // 3. Log format follows the environment: pretty locally, JSON in
    // production for ingestion by log aggregators.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database initialization (Postgres).
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. OTP collaborator: the real provider in production, the mock locally
    // so development runs never send SMS traffic.
    let otp: OtpState = match config.env {
        Env::Production => Arc::new(TwilioVerifyClient::new(
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_verify_sid,
        )),
        Env::Local => Arc::new(MockOtpService::new()),
    };

    // 6. Token manager: built once from the signing secret; shared read-only.
    let tokens = TokenManager::from_hours(&config.jwt_secret, config.token_lifetime_hours);

    let app_state = AppState {
        repo,
        otp,
        tokens,
        config,
    };

    // 7. Router and server startup.
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:8090")
        .await
        .expect("FATAL: failed to bind 0.0.0.0:8090");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:8090");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:8090/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
