use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// Everything here is a thin proxy: presence validation, forward, normalize.
///
/// Security Mandate:
/// No handler in this module may relay raw backend text on a malformed upstream
/// reply; the generic error envelope is substituted instead (enforced in the
/// shared relay path).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the gateway is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/signin/code
        // Requests a one-time sign-in code be emailed to an existing account.
        .route("/auth/signin/code", post(handlers::send_signin_code))
        // POST /auth/signup/code
        // Requests a one-time sign-up code; also carries the desired username.
        .route("/auth/signup/code", post(handlers::send_signup_code))
        // POST /auth/verify
        // Redeems a one-time code. The backend's Set-Cookie header (the session
        // credential) is relayed to the browser on success.
        .route("/auth/verify", post(handlers::verify_code))
        // GET /auth/session
        // Cookie-forwarded session verification. An empty payload means logged out;
        // the dashboard shell and both guards are built on this endpoint.
        .route("/auth/session", get(handlers::get_session))
}
