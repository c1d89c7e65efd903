use std::env;
use std::time::Duration;

/// AppConfig
///
/// Holds the gateway's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across all request handlers and the
/// background polling tasks. It is pulled into the application state via FromRef,
/// embodying the "immutable AppConfig" part of the Unified State Pattern.
#[derive(Clone)]
pub struct AppConfig {
    // Base URL of the hosting backend that owns all real state (sessions, codes,
    // plans, deployments). Every outbound call the gateway makes targets this origin.
    pub backend_base_url: String,
    // Runtime environment marker. Controls log formatting and fail-fast behavior.
    pub env: Env,
    // Interval between plan/usage status polls.
    pub poll_interval: Duration,
    // Language segment used when a guard has to build a redirect path and the
    // request carries no explicit language.
    pub default_lang: String,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (pretty logs, localhost backend fallback) and production-grade behavior
/// (JSON logs, mandatory backend origin).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    /// This allows tests to instantiate the configuration without needing to set
    /// environment variables for lightweight state scaffolding.
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8080".to_string(),
            env: Env::Local,
            poll_interval: Duration::from_millis(5000),
            default_lang: "en".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the gateway configuration at startup.
    /// It reads all parameters from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment (especially Production) is not found. This prevents the gateway
    /// from starting with an incomplete configuration and silently proxying into
    /// the void.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // Backend Origin Resolution
        // The production origin is mandatory and must be explicitly set; locally we
        // fall back to the conventional Dockerized backend port.
        let backend_base_url = match env {
            Env::Production => env::var("BACKEND_BASE_URL")
                .expect("FATAL: BACKEND_BASE_URL must be set in production."),
            _ => env::var("BACKEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        };

        // Poll interval is tunable but defaults to the dashboard's 5 second cadence.
        let poll_interval = env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(5000));

        let default_lang = env::var("DEFAULT_LANG").unwrap_or_else(|_| "en".to_string());

        Self {
            backend_base_url,
            env,
            poll_interval,
            default_lang,
        }
    }
}
