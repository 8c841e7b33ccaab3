//! Route definitions for chapter questions, answers and generation jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{chapter, question};
use crate::state::AppState;

/// ```text
/// GET  /chapter/{id}/questions         -> list_questions
/// GET  /chapters/{id}/generation-jobs  -> list_jobs
/// POST /generation-jobs/{id}/retry     -> retry_job
/// POST /questions/{id}/responses       -> question::submit_response
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chapter/{id}/questions", get(chapter::list_questions))
        .route("/chapters/{id}/generation-jobs", get(chapter::list_jobs))
        .route("/generation-jobs/{id}/retry", post(chapter::retry_job))
        .route("/questions/{id}/responses", post(question::submit_response))
}
