use crate::models::SessionUser;
use crate::permissions::has_section_permission;
use crate::session::{SessionClient, SessionState};

/// GuardOutcome
///
/// The decision of a protected-page guard. `Allow` carries the resolved session
/// user and is the only path that unblocks rendering; everything else is a
/// redirect. Note the deliberate conflation: an authenticated user lacking the
/// required section is sent to sign-in just like an anonymous one. There is no
/// distinct forbidden state, so the guarded page leaks nothing about whether a
/// section exists for other roles.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    Allow(SessionUser),
    Redirect(String),
}

/// GuestOutcome
///
/// The decision of a guest-only-page guard (sign-in/sign-up). A live session
/// redirects into the dashboard; anything else stays put.
#[derive(Debug, Clone, PartialEq)]
pub enum GuestOutcome {
    Stay,
    Redirect(String),
}

/// signin_path / dashboard_path
///
/// Redirect targets are language-prefixed, matching the marketing site's URL
/// scheme.
pub fn signin_path(lang: &str) -> String {
    format!("/{}/signin", lang)
}

pub fn dashboard_path(lang: &str) -> String {
    format!("/{}/dashboard", lang)
}

/// evaluate_section_guard
///
/// The protected-route gate. Runs exactly one session check, then one static
/// permission lookup. Authenticated AND section-permitted → Allow with the
/// session user. Otherwise → Redirect, to `redirect_override` when given, else
/// `/{lang}/signin`. Never errors: every failure mode of the session check has
/// already been folded into `Unauthenticated`.
pub async fn evaluate_section_guard(
    client: &SessionClient,
    cookie: Option<&str>,
    section: &str,
    lang: &str,
    redirect_override: Option<&str>,
) -> GuardOutcome {
    let fallback = || {
        redirect_override
            .map(str::to_string)
            .unwrap_or_else(|| signin_path(lang))
    };

    match client.fetch(cookie).await {
        SessionState::Authenticated(user) => {
            if has_section_permission(&user.role, section) {
                GuardOutcome::Allow(user)
            } else {
                // Authorized identity, insufficient role: same redirect as
                // anonymous (see GuardOutcome docs).
                GuardOutcome::Redirect(fallback())
            }
        }
        SessionState::Unauthenticated => GuardOutcome::Redirect(fallback()),
    }
}

/// evaluate_guest_guard
///
/// The reverse gate for sign-in/sign-up pages: a user who already holds a live
/// session has no business there and is moved into the dashboard. The same
/// fold-all-failures-to-absent policy applies, so a flaky backend leaves the
/// visitor on the guest page rather than bouncing them around.
pub async fn evaluate_guest_guard(
    client: &SessionClient,
    cookie: Option<&str>,
    lang: &str,
    redirect_override: Option<&str>,
) -> GuestOutcome {
    match client.fetch(cookie).await {
        SessionState::Authenticated(_) => {
            let target = redirect_override
                .map(str::to_string)
                .unwrap_or_else(|| dashboard_path(lang));
            GuestOutcome::Redirect(target)
        }
        SessionState::Unauthenticated => GuestOutcome::Stay,
    }
}
