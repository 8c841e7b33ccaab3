//! Session layer for protected routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use quizdeck_core::error::CoreError;

use crate::auth::cookie::{self, JWT_COOKIE};
use crate::auth::jwt;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Read the session token: the `jwt` cookie first, then a bearer header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(c) = jar.get(JWT_COOKIE) {
        if !c.value().is_empty() {
            return Some(c.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Reject unauthenticated requests and attach [`AuthUser`] to the rest.
///
/// - No token: 401.
/// - Invalid or expired token: 401 and the `jwt` cookie is cleared.
/// - Valid token: the request proceeds. If less than the refresh threshold
///   remains, a fresh token is set on the response. A failed reissue is
///   logged and the original response is returned unchanged.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return AppError::Core(CoreError::Unauthorized("Not authenticated".into())).into_response();
    };

    let claims = match jwt::verify(&token, &state.config.jwt) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session token");
            let mut response =
                AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
                    .into_response();
            cookie::append(
                &mut response,
                &cookie::clear(JWT_COOKIE, state.config.cookie_secure),
            );
            return response;
        }
    };

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email.clone(),
    });

    let mut response = next.run(request).await;

    let now = chrono::Utc::now().timestamp();
    if jwt::needs_refresh(&claims, now, state.config.jwt.refresh_threshold()) {
        match jwt::issue_session(claims.sub, claims.email.as_deref(), &state.config.jwt) {
            Ok(fresh) => {
                tracing::debug!(user_id = claims.sub, "Reissued session token");
                cookie::append(
                    &mut response,
                    &cookie::build(
                        JWT_COOKIE,
                        &fresh,
                        state.config.jwt.ttl().num_seconds(),
                        state.config.cookie_secure,
                    ),
                );
            }
            Err(e) => tracing::warn!(user_id = claims.sub, error = %e, "Session token reissue failed"),
        }
    }

    response
}
