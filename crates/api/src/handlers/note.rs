//! Handlers for the caller's own study notes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quizdeck_core::error::CoreError;
use quizdeck_core::types::DbId;
use quizdeck_db::models::note::{CreateNote, Note, UpdateNote};
use quizdeck_db::repositories::NoteRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Note", id })
}

/// POST /api/notes
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateNote>,
) -> AppResult<(StatusCode, Json<DataResponse<Note>>)> {
    if input.title.trim().is_empty() || input.content.trim().is_empty() {
        return Err(AppError::BadRequest("Title and content are required".into()));
    }

    let note = NoteRepo::create(&state.pool, auth.user_id, &input).await?;
    tracing::info!(note_id = note.id, user_id = auth.user_id, "Note created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: note })))
}

/// GET /api/notes
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Note>>>> {
    let notes = NoteRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: notes }))
}

/// GET /api/notes/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Note>>> {
    let note = NoteRepo::find_for_user(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: note }))
}

/// PUT /api/notes/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateNote>,
) -> AppResult<Json<DataResponse<Note>>> {
    if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Note title must not be empty".into()));
    }

    let note = NoteRepo::update_for_user(&state.pool, id, auth.user_id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(note_id = id, user_id = auth.user_id, "Note updated");
    Ok(Json(DataResponse { data: note }))
}

/// DELETE /api/notes/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NoteRepo::delete_for_user(&state.pool, id, auth.user_id).await? {
        return Err(not_found(id));
    }
    tracing::info!(note_id = id, user_id = auth.user_id, "Note deleted");
    Ok(StatusCode::NO_CONTENT)
}
