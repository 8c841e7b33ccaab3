//! Route definitions for sign-in and session endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes reachable without a session.
///
/// ```text
/// GET  /auth/google           -> google_login
/// GET  /auth/google/callback  -> google_callback
/// POST /auth/_log             -> client_log
/// POST /verify-token          -> verify_token
/// POST /logout                -> logout
/// ```
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(auth::google_login))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/auth/_log", post(auth::client_log))
        .route("/verify-token", post(auth::verify_token))
        .route("/logout", post(auth::logout))
}

/// ```text
/// GET /auth/session  -> session
/// ```
pub fn session_router() -> Router<AppState> {
    Router::new().route("/auth/session", get(auth::session))
}
