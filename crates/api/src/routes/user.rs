//! Route definitions for the caller's own profile and answer log.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// ```text
/// GET  /user/me               -> me
/// PUT  /user/stripe-customer  -> link_stripe_customer
/// GET  /incorrect-answers     -> list_incorrect_answers
/// POST /incorrect-answers     -> log_incorrect_answer
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/me", get(user::me))
        .route("/user/stripe-customer", put(user::link_stripe_customer))
        .route(
            "/incorrect-answers",
            get(user::list_incorrect_answers).post(user::log_incorrect_answer),
        )
}
