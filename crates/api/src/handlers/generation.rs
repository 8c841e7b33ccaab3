//! Callbacks from the generation service.
//!
//! The service posts generated questions back here. When
//! `GENERATION_CALLBACK_TOKEN` is configured each callback must carry it in
//! the `x-callback-token` header. A callback fulfils the job it names in
//! `job_ID`, or the oldest open job of the same kind for the chapter.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use quizdeck_core::error::CoreError;
use quizdeck_core::generation::{JOB_KIND_CHAPTER, JOB_KIND_SIMILAR};
use quizdeck_core::grading;
use quizdeck_core::types::{DbId, LooseId};
use quizdeck_db::models::question::NewQuestion;
use quizdeck_db::repositories::{ChapterRepo, GenerationJobRepo, NotebookRepo, QuestionRepo};
use quizdeck_generation::types::{GeneratedQuestion, GeneratedResponse, SimilarResponse};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

pub const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

const DEFAULT_EXPLANATION: &str = "No explanation provided";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResult {
    pub chapter_id: DbId,
    pub questions_added: usize,
    /// The job marked fulfilled, if one could be matched.
    pub job_id: Option<DbId>,
}

fn check_callback_token(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = state.config.generation.callback_token.as_deref() else {
        return Ok(());
    };
    let presented = headers
        .get(CALLBACK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid callback token".into(),
        )));
    }
    Ok(())
}

fn required_id(id: Option<&LooseId>, field: &str) -> AppResult<DbId> {
    id.and_then(LooseId::as_db_id)
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

/// Validate generated questions and convert them for storage.
fn to_new_questions(
    questions: Option<Vec<GeneratedQuestion>>,
    default_explanation: Option<&str>,
) -> AppResult<Vec<NewQuestion>> {
    let questions = questions
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("questions must be a non-empty array".into()))?;

    questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            grading::validate_question(&q.question, &q.answer_choices)
                .map_err(|e| AppError::BadRequest(format!("Question {i}: {e}")))?;
            Ok(NewQuestion {
                question: q.question,
                answer_choices: q.answer_choices,
                explanation: q
                    .explanation
                    .or_else(|| default_explanation.map(str::to_string)),
                concept: q.concept,
            })
        })
        .collect()
}

/// Mark the job a callback answers as fulfilled.
async fn fulfil_job(
    state: &AppState,
    chapter_id: DbId,
    kind: &str,
    job_id: Option<&LooseId>,
    requested_by: Option<DbId>,
) -> AppResult<Option<DbId>> {
    let job = match job_id.and_then(LooseId::as_db_id) {
        Some(id) => GenerationJobRepo::fulfil(&state.pool, id, chapter_id).await?,
        None => {
            GenerationJobRepo::fulfil_oldest_open(&state.pool, chapter_id, kind, requested_by)
                .await?
        }
    };
    if job.is_none() {
        tracing::warn!(chapter_id, kind, "Callback matched no open generation job");
    }
    Ok(job.map(|j| j.id))
}

/// POST /api/generatedresponse
pub async fn generated_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<GeneratedResponse>,
) -> AppResult<Json<DataResponse<CallbackResult>>> {
    check_callback_token(&state, &headers)?;

    let chapter_id = required_id(input.chapter_id.as_ref(), "ID")?;
    let questions = to_new_questions(input.questions, None)?;

    ChapterRepo::find_by_id(&state.pool, chapter_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Chapter",
            id: chapter_id,
        }))?;

    let stored = QuestionRepo::append(&state.pool, chapter_id, None, None, &questions).await?;
    let job_id = fulfil_job(
        &state,
        chapter_id,
        JOB_KIND_CHAPTER,
        input.job_id.as_ref(),
        None,
    )
    .await?;
    tracing::info!(chapter_id, count = stored.len(), ?job_id, "Generated questions stored");

    Ok(Json(DataResponse {
        data: CallbackResult {
            chapter_id,
            questions_added: stored.len(),
            job_id,
        },
    }))
}

/// POST /api/similarresponse
///
/// Follow-up questions for one reader. They are visible only to `user_ID`
/// when given, otherwise to every reader of the chapter.
pub async fn similar_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SimilarResponse>,
) -> AppResult<Json<DataResponse<CallbackResult>>> {
    check_callback_token(&state, &headers)?;

    let notebook_id = required_id(input.notebook_id.as_ref(), "notebook_ID")?;
    let chapter_id = required_id(input.chapter_id.as_ref(), "chapter_ID")?;
    let question_id = required_id(input.question_id.as_ref(), "question_ID")?;
    let user_id = input.user_id.as_ref().and_then(LooseId::as_db_id);
    let questions = to_new_questions(input.questions, Some(DEFAULT_EXPLANATION))?;

    NotebookRepo::find_by_id(&state.pool, notebook_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notebook",
            id: notebook_id,
        }))?;
    ChapterRepo::find_in_notebook(&state.pool, notebook_id, chapter_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Chapter",
            id: chapter_id,
        }))?;

    // The source question may have been deleted since the request went out.
    let source = QuestionRepo::find_by_id(&state.pool, question_id)
        .await?
        .filter(|q| q.chapter_id == chapter_id)
        .map(|q| q.id);

    let stored =
        QuestionRepo::append(&state.pool, chapter_id, user_id, source, &questions).await?;
    let job_id = fulfil_job(
        &state,
        chapter_id,
        JOB_KIND_SIMILAR,
        input.job_id.as_ref(),
        user_id,
    )
    .await?;
    tracing::info!(
        chapter_id,
        question_id,
        user_id = ?user_id,
        count = stored.len(),
        "Similar questions stored"
    );

    Ok(Json(DataResponse {
        data: CallbackResult {
            chapter_id,
            questions_added: stored.len(),
            job_id,
        },
    }))
}

#[cfg(test)]
mod tests {
    use quizdeck_core::grading::AnswerChoice;

    use super::*;

    fn generated(question: &str, choices: usize) -> GeneratedQuestion {
        GeneratedQuestion {
            question: question.into(),
            answer_choices: (0..choices)
                .map(|i| AnswerChoice {
                    value: format!("choice {i}"),
                    correct: i == 0,
                })
                .collect(),
            explanation: None,
            concept: None,
        }
    }

    #[test]
    fn empty_question_list_is_rejected() {
        assert!(to_new_questions(None, None).is_err());
        assert!(to_new_questions(Some(vec![]), None).is_err());
    }

    #[test]
    fn question_without_choices_is_rejected() {
        let result = to_new_questions(Some(vec![generated("What?", 0)]), None);
        assert!(result.is_err());
    }

    #[test]
    fn default_explanation_fills_missing_ones() {
        let stored =
            to_new_questions(Some(vec![generated("What?", 2)]), Some(DEFAULT_EXPLANATION))
                .unwrap();
        assert_eq!(stored[0].explanation.as_deref(), Some(DEFAULT_EXPLANATION));
    }
}
