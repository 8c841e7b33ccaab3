//! Answering chapter questions.

use axum::extract::{Path, State};
use axum::Json;
use quizdeck_core::error::CoreError;
use quizdeck_core::generation::{JOB_KIND_SIMILAR, SIMILAR_QUESTION_COUNT};
use quizdeck_core::grading;
use quizdeck_core::permissions::{self, Capability};
use quizdeck_core::types::DbId;
use quizdeck_db::models::chapter::Chapter;
use quizdeck_db::models::question::Question;
use quizdeck_db::models::user_response::{SubmitResponse, UserResponse};
use quizdeck_db::repositories::{
    ChapterRepo, NotebookRepo, QuestionRepo, UserRepo, UserResponseRepo,
};
use quizdeck_generation::types::SimilarQuestionRequest;
use serde::Serialize;

use crate::dispatch;
use crate::error::{AppError, AppResult};
use crate::handlers::chapter::chapter_access;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedResponse {
    pub response: UserResponse,
    pub correct: bool,
    /// The follow-up job recorded for an incorrect answer.
    pub follow_up_job_id: Option<DbId>,
}

fn similar_request(chapter: &Chapter, question: &Question, user_id: DbId) -> SimilarQuestionRequest {
    SimilarQuestionRequest {
        notebook_id: chapter.notebook_id.to_string(),
        chapter_id: chapter.id.to_string(),
        user_id: user_id.to_string(),
        question_id: question.id.to_string(),
        job_id: None,
        text: chapter.content.clone(),
        question: question.question.clone(),
        answer_choices: question.answer_choices.0.clone(),
        explanation: question.explanation.clone(),
        concept: question.concept.clone(),
        style: chapter.question_style.clone(),
        num_questions: SIMILAR_QUESTION_COUNT,
        bold: chapter.strategic_mode,
    }
}

/// POST /api/questions/{id}/responses
///
/// Record the caller's answer. An incorrect answer also asks the
/// generation service for a similar question scoped to the caller.
pub async fn submit_response(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitResponse>,
) -> AppResult<Json<DataResponse<GradedResponse>>> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Question",
            id,
        })
    };
    let question = QuestionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    if question
        .created_for_user
        .is_some_and(|owner| owner != auth.user_id)
    {
        return Err(not_found());
    }

    let chapter = ChapterRepo::find_by_id(&state.pool, question.chapter_id)
        .await?
        .ok_or_else(not_found)?;
    let notebook = NotebookRepo::find_by_id(&state.pool, chapter.notebook_id)
        .await?
        .ok_or_else(not_found)?;
    let access = chapter_access(&state, &notebook, chapter.id, auth.user_id).await?;
    if !permissions::can(access, Capability::Read) {
        return Err(not_found());
    }

    let correct = grading::is_correct(&question.answer_choices.0, &input.selected_answer);
    let response = UserResponseRepo::upsert(
        &state.pool,
        auth.user_id,
        id,
        &input.selected_answer,
        input.flagged,
        correct,
    )
    .await?;
    tracing::info!(question_id = id, user_id = auth.user_id, correct, "Response recorded");

    let mut follow_up_job_id = None;
    if !correct {
        let job = dispatch::record_job(
            &state.pool,
            JOB_KIND_SIMILAR,
            chapter.id,
            auth.user_id,
            Some(id),
            &similar_request(&chapter, &question, auth.user_id),
            &state.config.generation.policy,
        )
        .await?;
        UserRepo::increment_generation_count(&state.pool, auth.user_id, SIMILAR_QUESTION_COUNT)
            .await?;
        follow_up_job_id = Some(job.id);
        dispatch::spawn_send(state.pool.clone(), state.generation.clone(), job);
    }

    Ok(Json(DataResponse {
        data: GradedResponse {
            response,
            correct,
            follow_up_job_id,
        },
    }))
}
