use std::sync::Arc;

use crate::backend::{BackendGateway, GatewayError};
use crate::models::{SessionPayload, SessionUser};
use crate::permissions::NO_PLAN;

/// SessionState
///
/// The two-variant result of a session check. There is intentionally no error
/// variant: a backend that is unreachable, answers non-2xx, or returns a
/// malformed payload is indistinguishable from "not logged in" at this layer.
/// Every failure path below maps to `Unauthenticated` by explicit match, so the
/// fold is a stated policy rather than accidental error suppression. The UX
/// consequence is uniform: the user lands on sign-in either way.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Authenticated(SessionUser),
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// SessionClient
///
/// Resolves the current session by querying the backend's verification endpoint.
/// One HTTP GET per call, cookie credentials forwarded, no retry and no
/// polling—callers decide when a fresh check is needed (typically once per page
/// mount).
#[derive(Clone)]
pub struct SessionClient {
    gateway: Arc<dyn BackendGateway>,
}

impl SessionClient {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// fetch
    ///
    /// Issues the single verification request and folds the outcome into a
    /// SessionState. "Logged in" requires both a non-empty `username` AND a
    /// non-empty `role` in a 2xx JSON payload; a payload carrying only one of
    /// them is as good as no session. `plan` alone may be omitted and defaults
    /// to no-plan, keeping the deploy gate fail-closed.
    pub async fn fetch(&self, cookie: Option<&str>) -> SessionState {
        let reply = match self.gateway.fetch_session(cookie).await {
            Ok(reply) => reply,
            Err(GatewayError::Transport(detail)) => {
                // Unreachable backend is treated exactly like a missing session.
                tracing::debug!(%detail, "session check failed at transport level");
                return SessionState::Unauthenticated;
            }
            Err(GatewayError::InvalidBody) => {
                tracing::debug!("session check returned a malformed payload");
                return SessionState::Unauthenticated;
            }
        };

        if !(200..300).contains(&reply.status) {
            return SessionState::Unauthenticated;
        }

        let payload: SessionPayload = match serde_json::from_value(reply.body) {
            Ok(payload) => payload,
            Err(_) => return SessionState::Unauthenticated,
        };

        match (payload.username, payload.role) {
            (Some(username), Some(role)) if !username.is_empty() && !role.is_empty() => {
                SessionState::Authenticated(SessionUser {
                    username,
                    role,
                    plan: payload.plan.unwrap_or_else(|| NO_PLAN.to_string()),
                })
            }
            // An absent or empty username means the cookie expired or never
            // existed; an identity without a role cannot pass any section check
            // and is treated the same way.
            _ => SessionState::Unauthenticated,
        }
    }
}
