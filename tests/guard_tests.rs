use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use skyhost_portal::{
    AppConfig, AppState, MockBackendGateway, SessionClient, create_router,
    backend::{BackendReply, GatewayError, GatewayState},
    guards::{GuardOutcome, GuestOutcome, evaluate_guest_guard, evaluate_section_guard},
    models::SessionUser,
    session::SessionState,
};
use std::sync::Arc;
use tower::util::ServiceExt;

fn client_with_session(reply: Result<BackendReply, GatewayError>) -> SessionClient {
    let gateway = Arc::new(MockBackendGateway::new().with_session(reply)) as GatewayState;
    SessionClient::new(gateway)
}

fn user_session() -> Result<BackendReply, GatewayError> {
    Ok(BackendReply::json(
        200,
        json!({"username": "a", "role": "user", "plan": "pro"}),
    ))
}

// --- Session Client Fold ---

#[tokio::test]
async fn session_client_resolves_a_full_payload() {
    let client = client_with_session(user_session());
    let state = client.fetch(None).await;
    assert_eq!(
        state,
        SessionState::Authenticated(SessionUser {
            username: "a".into(),
            role: "user".into(),
            plan: "pro".into(),
        })
    );
}

#[tokio::test]
async fn session_client_folds_every_failure_to_unauthenticated() {
    // Missing username.
    let client = client_with_session(Ok(BackendReply::json(200, json!({"role": "user"}))));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);

    // Empty username.
    let client = client_with_session(Ok(BackendReply::json(200, json!({"username": ""}))));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);

    // Username without a role: not a usable identity.
    let client = client_with_session(Ok(BackendReply::json(200, json!({"username": "a"}))));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);

    // Username with an empty role.
    let client =
        client_with_session(Ok(BackendReply::json(200, json!({"username": "a", "role": ""}))));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);

    // Non-2xx.
    let client = client_with_session(Ok(BackendReply::json(401, json!({"error": "expired"}))));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);

    // Malformed body shape.
    let client = client_with_session(Ok(BackendReply::json(200, json!(["not", "an", "object"]))));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);

    // Transport failure.
    let client = client_with_session(Err(GatewayError::Transport("refused".into())));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);

    // Non-JSON upstream.
    let client = client_with_session(Err(GatewayError::InvalidBody));
    assert_eq!(client.fetch(None).await, SessionState::Unauthenticated);
}

// --- Section Guard ---

#[tokio::test]
async fn section_guard_allows_a_permitted_section() {
    let client = client_with_session(user_session());
    let outcome = evaluate_section_guard(&client, None, "upload", "en", None).await;
    match outcome {
        GuardOutcome::Allow(user) => {
            assert_eq!(user.username, "a");
            assert_eq!(user.role, "user");
        }
        other => panic!("expected Allow, got {:?}", other),
    }
}

#[tokio::test]
async fn section_guard_redirects_an_unpermitted_section() {
    // 'user' holds no grant for 'plans', so authenticated-but-unauthorized
    // takes the same sign-in redirect as anonymous.
    let client = client_with_session(user_session());
    let outcome = evaluate_section_guard(&client, None, "plans", "en", None).await;
    assert_eq!(outcome, GuardOutcome::Redirect("/en/signin".to_string()));
}

#[tokio::test]
async fn section_guard_redirects_without_a_username() {
    let client = client_with_session(Ok(BackendReply::json(200, json!({"role": "user"}))));
    let outcome = evaluate_section_guard(&client, None, "upload", "en", None).await;
    assert_eq!(outcome, GuardOutcome::Redirect("/en/signin".to_string()));
}

#[tokio::test]
async fn section_guard_honors_language_and_override() {
    let client = client_with_session(Err(GatewayError::Transport("down".into())));

    let outcome = evaluate_section_guard(&client, None, "upload", "de", None).await;
    assert_eq!(outcome, GuardOutcome::Redirect("/de/signin".to_string()));

    let client = client_with_session(Err(GatewayError::Transport("down".into())));
    let outcome = evaluate_section_guard(&client, None, "upload", "de", Some("/de/welcome")).await;
    assert_eq!(outcome, GuardOutcome::Redirect("/de/welcome".to_string()));
}

#[tokio::test]
async fn section_guard_issues_exactly_one_session_request() {
    let mock = Arc::new(MockBackendGateway::new().with_session(user_session()));
    let client = SessionClient::new(mock.clone() as GatewayState);
    let _ = evaluate_section_guard(&client, None, "plans", "en", None).await;
    assert_eq!(mock.call_count(), 1);
}

// --- Guest Guard ---

#[tokio::test]
async fn guest_guard_redirects_an_authenticated_visitor() {
    let client = client_with_session(user_session());
    let outcome = evaluate_guest_guard(&client, None, "en", None).await;
    assert_eq!(outcome, GuestOutcome::Redirect("/en/dashboard".to_string()));
}

#[tokio::test]
async fn guest_guard_stays_put_when_unauthenticated() {
    let client = client_with_session(Ok(BackendReply::json(200, json!({}))));
    assert_eq!(evaluate_guest_guard(&client, None, "en", None).await, GuestOutcome::Stay);

    // A username without a role is not a live session: stay on the guest page.
    let client = client_with_session(Ok(BackendReply::json(200, json!({"username": "a"}))));
    assert_eq!(evaluate_guest_guard(&client, None, "en", None).await, GuestOutcome::Stay);

    // Backend outages also leave the visitor on the guest page.
    let client = client_with_session(Err(GatewayError::Transport("down".into())));
    assert_eq!(evaluate_guest_guard(&client, None, "en", None).await, GuestOutcome::Stay);
}

// --- Route-level guard behavior through the real router ---

fn app(session: Result<BackendReply, GatewayError>) -> axum::Router {
    let gateway = Arc::new(MockBackendGateway::new().with_session(session)) as GatewayState;
    create_router(AppState::new(gateway, AppConfig::default()))
}

#[tokio::test]
async fn guarded_route_serves_the_resolved_user() {
    let app = app(user_session());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/dashboard/upload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let user: SessionUser = serde_json::from_slice(&body).unwrap();
    assert_eq!(user.username, "a");
    assert_eq!(user.role, "user");
}

#[tokio::test]
async fn guarded_route_redirects_insufficient_roles_to_signin() {
    let app = app(user_session());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/dashboard/plans?lang=fr")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/fr/signin"
    );
}

#[tokio::test]
async fn guarded_route_redirects_anonymous_visitors() {
    let app = app(Ok(BackendReply::json(200, json!({}))));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/en/signin"
    );
}

#[tokio::test]
async fn guest_endpoint_matches_guard_semantics() {
    // Authenticated: 303 into the dashboard.
    let app_auth = app(user_session());
    let response = app_auth
        .oneshot(
            Request::builder()
                .uri("/auth/guest")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/en/dashboard"
    );

    // Anonymous: 204, no navigation.
    let app_anon = app(Ok(BackendReply::json(200, json!({}))));
    let response = app_anon
        .oneshot(
            Request::builder()
                .uri("/auth/guest")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(header::LOCATION).is_none());
}
