use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core gateway services and components.
pub mod backend;
pub mod code_entry;
pub mod config;
pub mod guards;
pub mod handlers;
pub mod models;
pub mod permissions;
pub mod poller;
pub mod session;

// Module for routing segregation (Public, Guest, Dashboard).
pub mod routes;
use guards::GuardOutcome;
use routes::{dashboard, guest, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use backend::{GatewayState, HttpBackendGateway, MockBackendGateway};
pub use config::AppConfig;
pub use session::SessionClient;

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the gateway.
/// It aggregates all API paths and data schemas decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::send_signin_code, handlers::send_signup_code, handlers::verify_code,
        handlers::get_session, handlers::guest_check, handlers::get_user_status,
        handlers::app_action, handlers::dashboard_view
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::SigninCodeRequest, models::SignupCodeRequest, models::VerifyCodeRequest,
            models::SessionPayload, models::SessionUser, models::UserStatus,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "skyhost-portal", description = "SkyHost dashboard gateway API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe, and
/// immutable container holding all essential gateway services and configuration,
/// shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Backend access: every outbound call goes through this trait object.
    pub gateway: GatewayState,
    /// Session resolution built over the gateway; used by both guards.
    pub sessions: SessionClient,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the session client over the gateway so the two can never disagree
    /// about which backend they talk to.
    pub fn new(gateway: GatewayState, config: AppConfig) -> Self {
        let sessions = SessionClient::new(gateway.clone());
        Self {
            gateway,
            sessions,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow handlers to selectively pull components from the
// shared AppState, keeping dependency boundaries explicit.

impl FromRef<AppState> for GatewayState {
    fn from_ref(app_state: &AppState) -> GatewayState {
        app_state.gateway.clone()
    }
}

impl FromRef<AppState> for SessionClient {
    fn from_ref(app_state: &AppState) -> SessionClient {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// lang_from_query
///
/// Pulls the `lang=` pair out of a raw query string. The middleware cannot use
/// the Query extractor without consuming the request, so this stays manual.
fn lang_from_query(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("lang="))
        .filter(|v| !v.is_empty())
}

/// section_guard_middleware
///
/// The protected-route gate for the dashboard router.
///
/// *Mechanism*: resolves the request path to its required section via the static
/// route map. Paths mapping to the `public` pseudo-section pass straight
/// through. For everything else the guard runs exactly one session verification,
/// then one permission lookup; an allowed request proceeds with the resolved
/// `SessionUser` in its extensions, anything else becomes a 303 to
/// `/{lang}/signin`. 303 keeps the guarded URL out of the browser's committed
/// history, matching replace-style navigation.
async fn section_guard_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let section = permissions::required_section(request.uri().path());
    if section == permissions::PUBLIC_SECTION {
        return next.run(request).await;
    }

    let lang = lang_from_query(request.uri().query())
        .unwrap_or(&state.config.default_lang)
        .to_string();
    let cookie = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match guards::evaluate_section_guard(&state.sessions, cookie.as_deref(), section, &lang, None)
        .await
    {
        GuardOutcome::Allow(user) => {
            // This insertion is the only mechanism that unblocks a section view.
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        GuardOutcome::Redirect(target) => Redirect::to(&target).into_response(),
    }
}

/// create_router
///
/// Assembles the gateway's entire routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Guest Routes: The reverse gate evaluates the session inside the handler.
        .merge(guest::guest_routes())
        // Dashboard Routes: Protected by the section-guard middleware.
        .merge(
            dashboard::dashboard_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                section_guard_middleware,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a span
                // that carries the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns x-request-id to the client so
                // browser-side reports can be correlated with gateway logs.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: includes the
/// `x-request-id` header (if present) in the structured logging metadata
/// alongside the HTTP method and URI, so every log line for a single request is
/// correlated by a unique ID.
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
