use crate::{
    AppState,
    backend::{BackendReply, GatewayError},
    guards::{GuestOutcome, evaluate_guest_guard},
    models::{
        ErrorResponse, SessionUser, SigninCodeRequest, SignupCodeRequest, UserStatus,
        VerifyCodeRequest,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// LangQuery
///
/// Optional language segment for guard redirects (`?lang=de`). Falls back to the
/// configured default when absent, so redirect paths are always well-formed.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct LangQuery {
    pub lang: Option<String>,
}

/// AppActionQuery
///
/// Identifies the app an action targets. `id` is formally optional so a missing
/// value becomes our 400 envelope instead of an extractor rejection.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct AppActionQuery {
    pub id: Option<Uuid>,
}

/// Lifecycle verbs the dashboard may relay. Anything else is rejected before
/// the backend is contacted.
const APP_ACTIONS: &[&str] = &["start", "stop", "restart", "delete"];

// --- Relay Helpers ---

/// cookie_header
///
/// The browser's raw cookie header, forwarded verbatim on cookie-authenticated
/// backend calls. The gateway never parses or stores the credential.
fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::COOKIE).and_then(|v| v.to_str().ok())
}

/// missing_field
///
/// The shared 400 shape for presence validation: `{"error": "<field> is required"}`.
fn missing_field(name: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(format!("{} is required", name))),
    )
        .into_response()
}

/// relay
///
/// Translates a gateway result into the proxy's response, applying the error
/// normalization policy:
/// - well-formed upstream reply → upstream status and JSON body, unchanged, with
///   any Set-Cookie headers carried through (the verify endpoint issues the
///   session cookie this way);
/// - non-JSON upstream body → generic 500, raw text never forwarded;
/// - transport failure → generic 500, detail confined to the logs.
fn relay(result: Result<BackendReply, GatewayError>) -> Response {
    match result {
        Ok(reply) => {
            let status =
                StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut response = (status, Json(reply.body)).into_response();
            for cookie in reply.set_cookies {
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
            }
            response
        }
        Err(GatewayError::InvalidBody) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("invalid server response")),
        )
            .into_response(),
        Err(GatewayError::Transport(detail)) => {
            tracing::error!(%detail, "backend unreachable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("internal server error")),
            )
                .into_response()
        }
    }
}

// --- Proxy Handlers ---

/// send_signin_code
///
/// [Public Route] Requests a one-time sign-in code for an existing account.
/// Presence validation only; the backend decides whether the address is known
/// (and answers identically either way, to avoid account enumeration).
#[utoipa::path(
    post,
    path = "/auth/signin/code",
    request_body = SigninCodeRequest,
    responses(
        (status = 200, description = "Code sent"),
        (status = 400, description = "Missing email", body = ErrorResponse)
    )
)]
pub async fn send_signin_code(
    State(state): State<AppState>,
    Json(payload): Json<SigninCodeRequest>,
) -> Response {
    if payload.email.trim().is_empty() {
        return missing_field("email");
    }
    relay(state.gateway.send_signin_code(&payload.email).await)
}

/// send_signup_code
///
/// [Public Route] Requests a one-time sign-up code. Both the email and the
/// desired username must be present; the backend reserves the username pending
/// verification.
#[utoipa::path(
    post,
    path = "/auth/signup/code",
    request_body = SignupCodeRequest,
    responses(
        (status = 200, description = "Code sent"),
        (status = 400, description = "Missing field", body = ErrorResponse)
    )
)]
pub async fn send_signup_code(
    State(state): State<AppState>,
    Json(payload): Json<SignupCodeRequest>,
) -> Response {
    if payload.email.trim().is_empty() {
        return missing_field("email");
    }
    if payload.username.trim().is_empty() {
        return missing_field("username");
    }
    relay(
        state
            .gateway
            .send_signup_code(&payload.email, &payload.username)
            .await,
    )
}

/// verify_code
///
/// [Public Route] Redeems a one-time code. On success the backend's Set-Cookie
/// header (the session credential) is relayed to the browser; the gateway itself
/// holds nothing.
#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Verified, session cookie set"),
        (status = 400, description = "Missing field", body = ErrorResponse)
    )
)]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Response {
    if payload.email.trim().is_empty() {
        return missing_field("email");
    }
    if payload.code.trim().is_empty() {
        return missing_field("code");
    }
    relay(state.gateway.verify_code(&payload.email, &payload.code).await)
}

/// get_session
///
/// [Public Route] Cookie-forwarded session verification proxy. The dashboard
/// shell calls this on mount; an empty payload (no username) means logged out.
#[utoipa::path(
    get,
    path = "/auth/session",
    responses((status = 200, description = "Session payload (possibly empty)"))
)]
pub async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    relay(state.gateway.fetch_session(cookie_header(&headers)).await)
}

/// guest_check
///
/// [Guest Route] Backs the sign-in/sign-up pages' reverse gate. An already
/// authenticated visitor is bounced into the dashboard (303, so the guest page
/// never becomes a committed navigation); everyone else gets 204 and stays.
#[utoipa::path(
    get,
    path = "/auth/guest",
    params(LangQuery),
    responses(
        (status = 204, description = "No session, stay on the guest page"),
        (status = 303, description = "Authenticated, redirected to the dashboard")
    )
)]
pub async fn guest_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LangQuery>,
) -> Response {
    let lang = query.lang.unwrap_or_else(|| state.config.default_lang.clone());
    match evaluate_guest_guard(&state.sessions, cookie_header(&headers), &lang, None).await {
        GuestOutcome::Stay => StatusCode::NO_CONTENT.into_response(),
        GuestOutcome::Redirect(target) => Redirect::to(&target).into_response(),
    }
}

/// get_user_status
///
/// [Dashboard Route] Cookie-forwarded plan/usage status proxy; the endpoint the
/// status poller hits every interval tick.
#[utoipa::path(
    get,
    path = "/user/status",
    responses((status = 200, description = "Plan and usage", body = UserStatus))
)]
pub async fn get_user_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    relay(state.gateway.fetch_status(cookie_header(&headers)).await)
}

/// app_action
///
/// [Dashboard Route] Relays an app lifecycle action (start/stop/restart/delete)
/// for the app named by `?id=`. Fire-and-forget from the dashboard's point of
/// view: the reply is relayed but nothing is awaited beyond it.
#[utoipa::path(
    post,
    path = "/apps/{action}",
    params(("action" = String, Path, description = "Lifecycle verb"), AppActionQuery),
    responses(
        (status = 200, description = "Action relayed"),
        (status = 400, description = "Unknown action or missing id", body = ErrorResponse)
    )
)]
pub async fn app_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(action): Path<String>,
    Query(query): Query<AppActionQuery>,
) -> Response {
    if !APP_ACTIONS.contains(&action.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("unknown action")),
        )
            .into_response();
    }
    let Some(id) = query.id else {
        return missing_field("id");
    };
    relay(
        state
            .gateway
            .app_action(&action, id, cookie_header(&headers))
            .await,
    )
}

/// dashboard_view
///
/// [Dashboard Route] The render-unblock payload for a guarded dashboard page.
/// Reached only after the section guard middleware allowed the request, which is
/// when it stashed the resolved user in the request extensions.
///
/// The same handler is registered on every static dashboard path
/// (`/dashboard`, `/dashboard/upload`, `/dashboard/databases`, ...); the docs
/// list the overview path, which stands in for all of them.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Guard allowed; resolved identity", body = SessionUser),
        (status = 303, description = "Redirected to sign-in by the guard")
    )
)]
pub async fn dashboard_view(Extension(user): Extension<SessionUser>) -> Json<SessionUser> {
    Json(user)
}
