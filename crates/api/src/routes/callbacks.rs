//! Route definitions for inbound service callbacks.
//!
//! These authenticate the caller themselves (callback token, payment
//! signature) rather than through a user session.

use axum::routing::post;
use axum::Router;

use crate::handlers::{generation, webhook};
use crate::state::AppState;

/// ```text
/// POST /generatedresponse  -> generated_response
/// POST /similarresponse    -> similar_response
/// POST /webhook            -> receive
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generatedresponse", post(generation::generated_response))
        .route("/similarresponse", post(generation::similar_response))
        .route("/webhook", post(webhook::receive))
}
