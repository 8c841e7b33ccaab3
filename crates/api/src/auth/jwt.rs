//! Session token issue and verification.
//!
//! Tokens are HS256-signed JWTs carrying a [`Claims`] payload. They travel
//! in the `jwt` cookie or an `Authorization: Bearer` header.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use quizdeck_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in every session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token id; two tokens issued in the same second still differ.
    pub jti: String,
}

/// Why a token was rejected. Callers treat every variant as
/// "unauthenticated".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Token signature does not match")]
    BadSignature,
    #[error("Token has expired")]
    Expired,
}

/// Configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Lifetime of an issued session token, in hours (default: 24).
    pub ttl_hours: i64,
    /// Tokens with less than this many hours left are reissued (default: 6).
    pub refresh_threshold_hours: i64,
}

const DEFAULT_TTL_HOURS: i64 = 24;
const DEFAULT_REFRESH_THRESHOLD_HOURS: i64 = 6;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                        | Required | Default |
    /// |--------------------------------|----------|---------|
    /// | `JWT_SECRET`                   | **yes**  | --      |
    /// | `JWT_TTL_HOURS`                | no       | `24`    |
    /// | `JWT_REFRESH_THRESHOLD_HOURS`  | no       | `6`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        Self {
            secret,
            ttl_hours: crate::config::parse_env("JWT_TTL_HOURS", DEFAULT_TTL_HOURS),
            refresh_threshold_hours: crate::config::parse_env(
                "JWT_REFRESH_THRESHOLD_HOURS",
                DEFAULT_REFRESH_THRESHOLD_HOURS,
            ),
        }
    }

    /// Session lifetime as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }

    /// Remaining-lifetime threshold below which a token is reissued.
    pub fn refresh_threshold(&self) -> Duration {
        Duration::hours(self.refresh_threshold_hours)
    }
}

/// Sign a token for `user_id` valid for `ttl` from now.
pub fn issue(
    user_id: DbId,
    email: Option<&str>,
    ttl: Duration,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        email: email.map(str::to_string),
        exp: now + ttl.num_seconds(),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Sign a token with the configured session lifetime.
pub fn issue_session(
    user_id: DbId,
    email: Option<&str>,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue(user_id, email, config.ttl(), config)
}

/// Verify a token's signature and expiry and return its claims.
///
/// No clock leeway is allowed: a token is invalid from the second it
/// expires.
pub fn verify(token: &str, config: &JwtConfig) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        _ => TokenError::Malformed,
    })
}

/// Whether a token with `claims` has less than `threshold` left at `now`
/// (Unix seconds).
pub fn needs_refresh(claims: &Claims, now: i64, threshold: Duration) -> bool {
    claims.exp - now < threshold.num_seconds()
}
