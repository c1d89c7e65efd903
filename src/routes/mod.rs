/// Router Module Index
///
/// Organizes the gateway's routing logic into access-segregated modules so the
/// guard policy is visible at the module level rather than buried per-handler.
///
/// The three modules map directly to the three access postures a page can have.

/// Routes accessible to any client: health, the code-sending and verification
/// proxies, and the raw session proxy. These hold no state and apply presence
/// validation only; real decisions belong to the backend.
pub mod public;

/// The reverse gate for guest-only pages (sign-in/sign-up): an authenticated
/// visitor is redirected into the dashboard.
pub mod guest;

/// Dashboard surface: section views protected by the session-guard middleware,
/// plus the cookie-forwarded status and app-action proxies.
pub mod dashboard;
