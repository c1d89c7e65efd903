use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Guest Router Module
///
/// The inverse gate. Sign-in and sign-up pages call this on mount: a visitor who
/// already holds a live session is redirected to the dashboard, everyone else is
/// told to stay. A flaky backend counts as "no session", so guests are never
/// bounced by an outage.
pub fn guest_routes() -> Router<AppState> {
    Router::new()
        // GET /auth/guest?lang=..
        // 204 when unauthenticated (remain on the guest page), 303 into the
        // dashboard when a session exists.
        .route("/auth/guest", get(handlers::guest_check))
}
