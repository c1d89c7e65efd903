use async_trait::async_trait;
use axum::http::header;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;

// 1. BackendGateway Contract

/// GatewayError
///
/// The two upstream failure classes the gateway distinguishes. Everything else
/// (backend-reported errors with well-formed JSON bodies) is not an error at this
/// layer: it is a reply to be relayed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// Network/connection failure reaching the backend. Surfaced to clients as a
    /// generic 500; the transport detail only goes to the logs.
    #[error("backend transport failure: {0}")]
    Transport(String),
    /// The backend answered, but with a non-JSON body or a missing/wrong
    /// content-type header. Raw upstream text is never forwarded.
    #[error("backend returned a non-JSON response")]
    InvalidBody,
}

/// BackendReply
///
/// A normalized upstream response: status code, parsed JSON body, and any
/// Set-Cookie headers the backend attached (the code-verification endpoint issues
/// the session cookie this way, and the gateway must relay it untouched).
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: u16,
    pub body: Value,
    pub set_cookies: Vec<String>,
}

impl BackendReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            set_cookies: Vec::new(),
        }
    }
}

/// BackendGateway
///
/// Defines the abstract contract for every call the gateway makes to the hosting
/// backend. This trait allows us to swap the concrete implementation—from the real
/// HTTP client (HttpBackendGateway) in production to the scripted Mock
/// (MockBackendGateway) during testing—without affecting handlers, guards, or the
/// status poller.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn BackendGateway>`) safely shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Cookie-authenticated session verification. The cookie header of the
    /// incoming browser request is forwarded verbatim.
    async fn fetch_session(&self, cookie: Option<&str>) -> Result<BackendReply, GatewayError>;

    /// Requests a one-time sign-in code be emailed to `email`.
    async fn send_signin_code(&self, email: &str) -> Result<BackendReply, GatewayError>;

    /// Requests a one-time sign-up code; the backend reserves `username` pending
    /// verification.
    async fn send_signup_code(
        &self,
        email: &str,
        username: &str,
    ) -> Result<BackendReply, GatewayError>;

    /// Redeems a one-time code. On success the backend sets the auth cookie,
    /// which arrives in `set_cookies`.
    async fn verify_code(&self, email: &str, code: &str) -> Result<BackendReply, GatewayError>;

    /// Cookie-authenticated plan/usage status. Polled.
    async fn fetch_status(&self, cookie: Option<&str>) -> Result<BackendReply, GatewayError>;

    /// App lifecycle action (start/stop/restart/delete), fire-and-forget from the
    /// dashboard's perspective.
    async fn app_action(
        &self,
        action: &str,
        id: Uuid,
        cookie: Option<&str>,
    ) -> Result<BackendReply, GatewayError>;
}

/// GatewayState
///
/// The concrete type used to share backend access across the application state.
pub type GatewayState = Arc<dyn BackendGateway>;

// 2. The Real Implementation (reqwest)

/// HttpBackendGateway
///
/// The concrete implementation talking HTTP to the hosting backend configured in
/// AppConfig. It owns a single reqwest::Client (connection pool) shared by all
/// requests and polling tasks.
#[derive(Clone)]
pub struct HttpBackendGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackendGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.backend_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// normalize
    ///
    /// Converts a raw reqwest response into a BackendReply, enforcing the JSON
    /// shape contract: a missing or non-JSON content-type, or an unparseable
    /// body, is folded into GatewayError::InvalidBody so raw backend text can
    /// never reach a browser.
    async fn normalize(response: reqwest::Response) -> Result<BackendReply, GatewayError> {
        let status = response.status().as_u16();

        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect::<Vec<_>>();

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Err(GatewayError::InvalidBody);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|_| GatewayError::InvalidBody)?;

        Ok(BackendReply {
            status,
            body,
            set_cookies,
        })
    }

    fn transport(e: reqwest::Error) -> GatewayError {
        GatewayError::Transport(e.to_string())
    }

    /// Attaches the browser's cookie header (if any) so backend endpoints doing
    /// cookie auth see the original credential.
    fn with_cookie(req: reqwest::RequestBuilder, cookie: Option<&str>) -> reqwest::RequestBuilder {
        match cookie {
            Some(value) => req.header(header::COOKIE, value),
            None => req,
        }
    }
}

#[async_trait]
impl BackendGateway for HttpBackendGateway {
    async fn fetch_session(&self, cookie: Option<&str>) -> Result<BackendReply, GatewayError> {
        let req = self.client.get(self.url("/auth/session"));
        let response = Self::with_cookie(req, cookie)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::normalize(response).await
    }

    async fn send_signin_code(&self, email: &str) -> Result<BackendReply, GatewayError> {
        let response = self
            .client
            .post(self.url("/auth/signin/code"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::normalize(response).await
    }

    async fn send_signup_code(
        &self,
        email: &str,
        username: &str,
    ) -> Result<BackendReply, GatewayError> {
        let response = self
            .client
            .post(self.url("/auth/signup/code"))
            .json(&serde_json::json!({ "email": email, "username": username }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::normalize(response).await
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<BackendReply, GatewayError> {
        let response = self
            .client
            .post(self.url("/auth/verify"))
            .json(&serde_json::json!({ "email": email, "code": code }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::normalize(response).await
    }

    async fn fetch_status(&self, cookie: Option<&str>) -> Result<BackendReply, GatewayError> {
        let req = self.client.get(self.url("/user/status"));
        let response = Self::with_cookie(req, cookie)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::normalize(response).await
    }

    async fn app_action(
        &self,
        action: &str,
        id: Uuid,
        cookie: Option<&str>,
    ) -> Result<BackendReply, GatewayError> {
        let req = self
            .client
            .post(self.url(&format!("/apps/{}", action)))
            .query(&[("id", id.to_string())]);
        let response = Self::with_cookie(req, cookie)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::normalize(response).await
    }
}

// 3. The Mock Implementation (For Tests)

type ScriptedReply = Result<BackendReply, GatewayError>;

/// MockBackendGateway
///
/// A scriptable implementation of `BackendGateway` used exclusively for unit and
/// integration testing. Each endpoint can be primed with a reply (the status
/// endpoint with a whole sequence, for poller tests), and every invocation is
/// recorded so tests can assert the backend was—or was not—called.
#[derive(Default)]
pub struct MockBackendGateway {
    session_reply: Mutex<Option<ScriptedReply>>,
    signin_code_reply: Mutex<Option<ScriptedReply>>,
    signup_code_reply: Mutex<Option<ScriptedReply>>,
    verify_reply: Mutex<Option<ScriptedReply>>,
    app_action_reply: Mutex<Option<ScriptedReply>>,
    // Consumed front-to-back; the final entry repeats once the script runs out.
    status_replies: Mutex<VecDeque<ScriptedReply>>,
    /// Record of invoked endpoint names, in call order.
    pub calls: Mutex<Vec<String>>,
}

impl MockBackendGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, reply: ScriptedReply) -> Self {
        *self.session_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_signin_code(self, reply: ScriptedReply) -> Self {
        *self.signin_code_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_signup_code(self, reply: ScriptedReply) -> Self {
        *self.signup_code_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_verify(self, reply: ScriptedReply) -> Self {
        *self.verify_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_app_action(self, reply: ScriptedReply) -> Self {
        *self.app_action_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_status_sequence(self, replies: Vec<ScriptedReply>) -> Self {
        *self.status_replies.lock().unwrap() = replies.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, endpoint: &str) {
        self.calls.lock().unwrap().push(endpoint.to_string());
    }

    fn scripted(&self, slot: &Mutex<Option<ScriptedReply>>) -> ScriptedReply {
        slot.lock()
            .unwrap()
            .clone()
            .unwrap_or(Err(GatewayError::Transport("no scripted reply".to_string())))
    }
}

#[async_trait]
impl BackendGateway for MockBackendGateway {
    async fn fetch_session(&self, _cookie: Option<&str>) -> Result<BackendReply, GatewayError> {
        self.record("fetch_session");
        self.scripted(&self.session_reply)
    }

    async fn send_signin_code(&self, _email: &str) -> Result<BackendReply, GatewayError> {
        self.record("send_signin_code");
        self.scripted(&self.signin_code_reply)
    }

    async fn send_signup_code(
        &self,
        _email: &str,
        _username: &str,
    ) -> Result<BackendReply, GatewayError> {
        self.record("send_signup_code");
        self.scripted(&self.signup_code_reply)
    }

    async fn verify_code(&self, _email: &str, _code: &str) -> Result<BackendReply, GatewayError> {
        self.record("verify_code");
        self.scripted(&self.verify_reply)
    }

    async fn fetch_status(&self, _cookie: Option<&str>) -> Result<BackendReply, GatewayError> {
        self.record("fetch_status");
        let mut script = self.status_replies.lock().unwrap();
        match script.len() {
            0 => Err(GatewayError::Transport("no scripted reply".to_string())),
            // Keep the last entry around so long-running pollers stay scripted.
            1 => script.front().cloned().unwrap_or(Err(GatewayError::InvalidBody)),
            _ => script.pop_front().unwrap_or(Err(GatewayError::InvalidBody)),
        }
    }

    async fn app_action(
        &self,
        _action: &str,
        _id: Uuid,
        _cookie: Option<&str>,
    ) -> Result<BackendReply, GatewayError> {
        self.record("app_action");
        self.scripted(&self.app_action_reply)
    }
}
