//! Route definitions for the `/questionbank` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::question_bank;
use crate::state::AppState;

/// Routes mounted at `/questionbank`.
///
/// ```text
/// GET  /                        -> list
/// POST /import                  -> import
/// POST /save-progress           -> save_progress
/// GET  /{source_file}           -> get_by_source_file
/// GET  /{source_file}/progress  -> get_progress
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(question_bank::list))
        .route("/import", post(question_bank::import))
        .route("/save-progress", post(question_bank::save_progress))
        .route("/{source_file}", get(question_bank::get_by_source_file))
        .route("/{source_file}/progress", get(question_bank::get_progress))
}
