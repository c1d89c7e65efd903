use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Dashboard Router Module
///
/// The session-guarded surface. Every `/dashboard/...` route here appears in the
/// route→section map; the section-guard middleware layered over this router in
/// `create_router` resolves the required section per path, verifies the session,
/// checks the role's section grant, and either injects the resolved user or
/// redirects to sign-in.
///
/// The status and app-action proxies also live here: they resolve to the
/// `public` pseudo-section so the middleware passes them through, and the
/// backend enforces its own cookie auth on the forwarded request.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        // GET /dashboard
        // The overview page gate ('overview' section).
        .route("/dashboard", get(handlers::dashboard_view))
        // GET /dashboard/upload — app deployment page ('upload' section).
        .route("/dashboard/upload", get(handlers::dashboard_view))
        // GET /dashboard/databases — managed databases page ('databases' section).
        .route("/dashboard/databases", get(handlers::dashboard_view))
        // GET /dashboard/plans — billing/plan management ('plans' section, admin territory).
        .route("/dashboard/plans", get(handlers::dashboard_view))
        // GET /dashboard/users — account administration ('users' section).
        .route("/dashboard/users", get(handlers::dashboard_view))
        // GET /dashboard/logs — deployment/application logs ('logs' section).
        .route("/dashboard/logs", get(handlers::dashboard_view))
        // GET /dashboard/support — support tooling ('support' section).
        .route("/dashboard/support", get(handlers::dashboard_view))
        // GET /user/status
        // Plan/usage proxy polled by the dashboard shell. Cookie-forwarded.
        .route("/user/status", get(handlers::get_user_status))
        // POST /apps/{action}?id=..
        // App lifecycle relay (start/stop/restart/delete). Cookie-forwarded.
        .route("/apps/{action}", post(handlers::app_action))
}
