use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Session Schemas ---

/// SessionPayload
///
/// The raw shape returned by the backend's session-verification endpoint.
/// Every field is optional at the wire level: an expired or missing cookie makes
/// the backend answer with an empty object rather than an error, so absence of
/// `username` is the logged-out signal.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionPayload {
    pub username: Option<String>,
    pub role: Option<String>,
    pub plan: Option<String>,
}

/// SessionUser
///
/// The resolved identity of a verified session. This is the payload handed to a
/// page once its guard allows rendering, and the analogue of the backend's
/// canonical user record from the gateway's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    // The user's primary identifier.
    pub username: String,
    // The RBAC field: 'admin', 'staff', 'dev', 'support' or 'user'.
    pub role: String,
    // Billing tier, gating features independently of role. 'no-plan' when the
    // account has no active subscription.
    pub plan: String,
}

// --- Request Payloads (Input Schemas) ---

/// SigninCodeRequest
///
/// Input payload for requesting a one-time sign-in code (POST /auth/signin/code).
/// The backend emails an 8-character code to this address.
///
/// All request payloads here use `#[serde(default)]`: an absent field
/// deserializes as an empty string and is caught by the handler's presence
/// validation (400 with a field-specific message), instead of bouncing off the
/// extractor as a 422.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct SigninCodeRequest {
    pub email: String,
}

/// SignupCodeRequest
///
/// Input payload for requesting a one-time sign-up code (POST /auth/signup/code).
/// Unlike sign-in, registration also needs the desired username so the backend can
/// reserve it before the code round-trip completes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct SignupCodeRequest {
    pub email: String,
    pub username: String,
}

/// VerifyCodeRequest
///
/// Input payload for redeeming a one-time code (POST /auth/verify).
/// On success the backend issues the session cookie; the gateway only relays it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

// --- Status Schemas (Output) ---

/// UserStatus
///
/// The plan/usage projection returned by the backend's status endpoint and
/// re-served by the gateway. Polled by the dashboard shell on a fixed cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserStatus {
    pub plan: String,
    pub used_mb: u64,
    pub total_mb: u64,
    pub can_deploy: bool,
}

/// StatusSnapshot
///
/// The poller's externally observable state: the latest status the backend
/// reported plus a loading marker that stays true only until the first
/// successful fetch. Transient fetch failures retain the previous status,
/// so consumers see slightly stale data instead of a blank dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct StatusSnapshot {
    pub status: UserStatus,
    pub loading: bool,
    // When the retained status was last refreshed; None before the first success.
    #[ts(type = "string | null")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            status: UserStatus::default(),
            loading: true,
            fetched_at: None,
        }
    }
}

// --- Error Schema ---

/// ErrorResponse
///
/// The single JSON error envelope the gateway emits. Upstream error bodies are
/// never relayed verbatim when they fail shape checks; they are replaced by one
/// of these with a generic message so raw backend output cannot leak.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
