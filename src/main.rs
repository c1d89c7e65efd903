use skyhost_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router, permissions,
};
use skyhost_portal::{GatewayState, HttpBackendGateway};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the gateway, responsible for initializing
/// all core components: Configuration, Logging, Backend Gateway, and the HTTP
/// Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing Production settings.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes the RUST_LOG environment variable, falling back to sensible
    // defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skyhost_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is dynamically selected based on APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for human readability during debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);
    tracing::info!("Proxying to backend at {}", config.backend_base_url);

    // 4. Permission Table Sanity Check
    // Warn-only: a section no role can reach means a dashboard page nobody can
    // ever open. Logged here, never enforced.
    let orphaned = permissions::validate_tables();
    if !orphaned.is_empty() {
        tracing::warn!(?orphaned, "permission tables leave sections unreachable");
    }

    // 5. Backend Gateway Initialization
    // A single reqwest connection pool shared by all proxy handlers and pollers.
    let gateway = Arc::new(HttpBackendGateway::new(&config)) as GatewayState;

    // 6. Unified State Assembly
    let app_state = AppState::new(gateway, config);

    // 7. Router and Server Startup
    let app = create_router(app_state);

    // Binds the TCP listener and initiates the HTTP server.
    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    // The long-running Axum server process.
    axum::serve(listener, app).await.unwrap();
}
