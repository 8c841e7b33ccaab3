//! Handlers for sign-in, token verification, logout and the session check.

use axum::extract::{Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::CookieJar;
use quizdeck_core::error::CoreError;
use quizdeck_db::models::user::SessionUser;
use quizdeck_db::repositories::UserRepo;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::cookie::{self, JWT_COOKIE, OAUTH_STATE_COOKIE, OAUTH_STATE_MAX_AGE_SECS};
use crate::auth::identity::{link_identity, LinkError};
use crate::auth::jwt;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::session::extract_token;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query string of the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declined consent.
    pub error: Option<String>,
}

/// Body of `POST /auth/_log`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientLog {
    pub log_message: Option<String>,
}

/// A `302 Found` redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

/// GET /api/auth/google
///
/// Redirects to the provider's consent screen. A random `state` is kept in
/// a short-lived cookie and checked on the way back.
pub async fn google_login(State(state): State<AppState>) -> AppResult<Response> {
    let provider = state
        .identity
        .as_ref()
        .ok_or_else(|| AppError::Upstream("Google sign-in is not configured".into()))?;

    let csrf = Uuid::new_v4().simple().to_string();
    let mut response = found(&provider.authorize_url(&csrf));
    cookie::append(
        &mut response,
        &cookie::build(
            OAUTH_STATE_COOKIE,
            &csrf,
            OAUTH_STATE_MAX_AGE_SECS,
            state.config.cookie_secure,
        ),
    );
    Ok(response)
}

/// GET /api/auth/google/callback
///
/// On success sets the session cookie and redirects to the frontend. Every
/// failure redirects to the frontend's login page with an error code.
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let secure = state.config.cookie_secure;
    let mut response = match complete_sign_in(&state, &jar, params).await {
        Ok(token) => {
            let mut response = found(&state.config.frontend_url);
            cookie::append(
                &mut response,
                &cookie::build(JWT_COOKIE, &token, state.config.jwt.ttl().num_seconds(), secure),
            );
            response
        }
        Err(reason) => found(&format!(
            "{}/login?error={reason}",
            state.config.frontend_url
        )),
    };
    cookie::append(&mut response, &cookie::clear(OAUTH_STATE_COOKIE, secure));
    response
}

/// Run the callback steps, returning a session token or a short failure
/// code for the login page.
async fn complete_sign_in(
    state: &AppState,
    jar: &CookieJar,
    params: CallbackParams,
) -> Result<String, &'static str> {
    if let Some(error) = params.error {
        tracing::info!(error = %error, "Provider reported sign-in failure");
        return Err("access_denied");
    }

    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || expected != params.state {
        tracing::warn!("OAuth state mismatch");
        return Err("state_mismatch");
    }

    let code = params.code.ok_or("missing_code")?;
    let provider = state.identity.as_ref().ok_or("oauth_disabled")?;

    let profile = provider.exchange_code(&code).await.map_err(|e| {
        tracing::warn!(error = %e, "OAuth code exchange failed");
        "exchange_failed"
    })?;

    let user = link_identity(&state.pool, &profile).await.map_err(|e| match e {
        LinkError::AccountConflict => "account_conflict",
        LinkError::Database(e) => {
            tracing::error!(error = %e, "Failed to link identity");
            "server_error"
        }
    })?;

    let token = jwt::issue_session(user.id, Some(&user.email), &state.config.jwt).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue session token");
        "server_error"
    })?;

    tracing::info!(user_id = user.id, "User signed in with Google");
    Ok(token)
}

// ---------------------------------------------------------------------------
// Token endpoints
// ---------------------------------------------------------------------------

fn invalid_token(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "isValid": false, "message": message })),
    )
        .into_response()
}

/// POST /api/verify-token
///
/// `{isValid: true, user}` for a valid token, otherwise 401
/// `{isValid: false, message}`.
pub async fn verify_token(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let Some(token) = extract_token(&headers) else {
        return Ok(invalid_token("No token provided"));
    };

    let claims = match jwt::verify(&token, &state.config.jwt) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            return Ok(invalid_token("Invalid token"));
        }
    };

    let Some(user) = UserRepo::find_by_id(&state.pool, claims.sub).await? else {
        return Ok(invalid_token("User not found"));
    };

    Ok(Json(json!({ "isValid": true, "user": SessionUser::from(&user) })).into_response())
}

/// POST /api/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = Json(json!({ "success": true })).into_response();
    cookie::append(
        &mut response,
        &cookie::clear(JWT_COOKIE, state.config.cookie_secure),
    );
    response
}

/// GET /api/auth/session
pub async fn session(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User is not authenticated".into())))?;
    Ok(Json(json!({
        "isAuthenticated": true,
        "user": SessionUser::from(&user),
    })))
}

/// POST /api/auth/_log
///
/// Forwards a frontend log line into the server log.
pub async fn client_log(Json(input): Json<ClientLog>) -> AppResult<Json<serde_json::Value>> {
    let message = input
        .log_message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("Log message is required".into()))?;
    tracing::info!(target: "client", entry = %message, "Client log entry");
    Ok(Json(json!({ "message": "Log recorded successfully" })))
}
