use std::time::Duration;

use quizdeck_core::generation::RetryPolicy;

use crate::auth::google::GoogleConfig;
use crate::auth::jwt::JwtConfig;
use crate::billing::StripeConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// Browser origin of the frontend; OAuth redirects and share links
    /// point here.
    pub frontend_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds.
    pub shutdown_timeout_secs: u64,
    /// Maximum request body size; chapter uploads carry media.
    pub max_upload_bytes: usize,
    /// Whether cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
    /// Token signing and lifetimes.
    pub jwt: JwtConfig,
    /// Google OAuth client; `None` disables the login routes.
    pub google: Option<GoogleConfig>,
    /// Payment webhook verification.
    pub stripe: StripeConfig,
    /// Generation service client and job policy.
    pub generation: GenerationConfig,
    /// Interval of the scheduled-downgrade sweep.
    pub downgrade_sweep_interval_secs: u64,
}

/// Settings for the remote generation service.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL, without trailing slash.
    pub api_url: String,
    /// When set, callbacks must present it in `x-callback-token`.
    pub callback_token: Option<String>,
    /// Per-job deadline and attempt cap.
    pub policy: RetryPolicy,
    /// Interval of the timeout/retry sweep.
    pub sweep_interval_secs: u64,
}

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 700 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                  |
    /// |---------------------------------|--------------------------|
    /// | `HOST`                          | `0.0.0.0`                |
    /// | `PORT`                          | `3001`                   |
    /// | `FRONTEND_URL`                  | `http://localhost:3000`  |
    /// | `CORS_ORIGINS`                  | `FRONTEND_URL`           |
    /// | `REQUEST_TIMEOUT_SECS`          | `300`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`         | `30`                     |
    /// | `MAX_UPLOAD_BYTES`              | `734003200`              |
    /// | `COOKIE_SECURE`                 | `false`                  |
    /// | `GENERATION_API_URL`            | `http://localhost:8000`  |
    /// | `GENERATION_CALLBACK_TOKEN`     | unset                    |
    /// | `GENERATION_JOB_TIMEOUT_SECS`   | `900`                    |
    /// | `GENERATION_MAX_ATTEMPTS`       | `3`                      |
    /// | `GENERATION_SWEEP_INTERVAL_SECS`| `60`                     |
    /// | `DOWNGRADE_SWEEP_INTERVAL_SECS` | `60`                     |
    ///
    /// Token, OAuth and webhook settings are read by [`JwtConfig::from_env`],
    /// [`GoogleConfig::from_env`] and [`StripeConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on malformed numeric values or a missing `JWT_SECRET`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = parse_env("PORT", 3001);

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| DEFAULT_FRONTEND_URL.into())
            .trim_end_matches('/')
            .to_string();

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| frontend_url.clone())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let policy = RetryPolicy {
            timeout: Duration::from_secs(parse_env("GENERATION_JOB_TIMEOUT_SECS", 900)),
            max_attempts: parse_env("GENERATION_MAX_ATTEMPTS", 3),
        };

        let generation = GenerationConfig {
            api_url: std::env::var("GENERATION_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".into())
                .trim_end_matches('/')
                .to_string(),
            callback_token: std::env::var("GENERATION_CALLBACK_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            policy,
            sweep_interval_secs: parse_env("GENERATION_SWEEP_INTERVAL_SECS", 60),
        };

        Self {
            host,
            port,
            frontend_url,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 300),
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            cookie_secure: parse_env("COOKIE_SECURE", false),
            jwt: JwtConfig::from_env(),
            google: GoogleConfig::from_env(),
            stripe: StripeConfig::from_env(),
            generation,
            downgrade_sweep_interval_secs: parse_env("DOWNGRADE_SWEEP_INTERVAL_SECS", 60),
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but does not parse.
pub(crate) fn parse_env<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}")),
        Err(_) => default,
    }
}
