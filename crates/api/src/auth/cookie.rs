//! `Set-Cookie` formatting for the session and OAuth state cookies.

use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::Response;

/// Session token cookie.
pub const JWT_COOKIE: &str = "jwt";
/// CSRF state for the OAuth round trip.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
/// Lifetime of the OAuth state cookie.
pub const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

/// An http-only, `SameSite=Lax` cookie scoped to `/`.
pub fn build(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// A cookie that makes the browser drop `name` immediately.
pub fn clear(name: &str, secure: bool) -> String {
    build(name, "", 0, secure)
}

/// Append a `Set-Cookie` header. Values that are not valid header text are
/// dropped with a warning.
pub fn append(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Dropping unencodable Set-Cookie header"),
    }
}
