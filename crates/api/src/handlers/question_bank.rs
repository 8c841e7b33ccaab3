//! Handlers for imported question banks and per-user progress through them.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use quizdeck_core::error::CoreError;
use quizdeck_core::grading;
use quizdeck_core::types::DbId;
use quizdeck_db::models::question_bank::{
    BankProgress, BankQuestion, ImportQuestionBank, ProgressDetail, QuestionBank,
    QuestionBankSummary, SaveProgress,
};
use quizdeck_db::repositories::QuestionBankRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub bank: QuestionBank,
    pub imported: usize,
    pub total_questions: i64,
}

/// Body of `GET /questionbank/{sourceFile}`.
#[derive(Debug, Serialize)]
pub struct BankQuestions {
    pub status: &'static str,
    pub mcqs: Vec<BankQuestion>,
}

async fn find_bank(state: &AppState, source_file: &str) -> AppResult<QuestionBank> {
    QuestionBankRepo::find_by_source_file(&state.pool, source_file)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundByKey {
                entity: "Question bank",
                key: source_file.to_string(),
            })
        })
}

/// Priced banks are open only to enrolled users and the creator.
async fn ensure_accessible(state: &AppState, bank: &QuestionBank, user_id: DbId) -> AppResult<()> {
    if bank.requires_enrollment()
        && bank.creator_id != Some(user_id)
        && !QuestionBankRepo::is_enrolled(&state.pool, bank.id, user_id).await?
    {
        return Err(AppError::Core(CoreError::Forbidden(
            "Purchase this question bank to access it".into(),
        )));
    }
    Ok(())
}

/// POST /api/questionbank/import
///
/// Append questions to the bank keyed by `sourceFile`, creating it when
/// absent. Only the creator may change an existing bank.
pub async fn import(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ImportQuestionBank>,
) -> AppResult<Json<DataResponse<ImportResult>>> {
    if input.source_file.trim().is_empty() {
        return Err(AppError::BadRequest("sourceFile is required".into()));
    }
    for (i, q) in input.questions.iter().enumerate() {
        grading::validate_question(&q.question, &q.answer_choices)
            .map_err(|e| AppError::BadRequest(format!("Question {i}: {e}")))?;
    }
    if input.price_cents.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("priceCents must not be negative".into()));
    }

    let (bank, total_questions) = QuestionBankRepo::import(&state.pool, auth.user_id, &input)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Forbidden(
                "Only the creator can change this question bank".into(),
            ))
        })?;
    tracing::info!(
        bank_id = bank.id,
        source_file = %bank.source_file,
        imported = input.questions.len(),
        "Question bank imported"
    );

    Ok(Json(DataResponse {
        data: ImportResult {
            bank,
            imported: input.questions.len(),
            total_questions,
        },
    }))
}

/// GET /api/questionbank
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<QuestionBankSummary>>>> {
    let banks = QuestionBankRepo::list_visible(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: banks }))
}

/// GET /api/questionbank/{source_file}
pub async fn get_by_source_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(source_file): Path<String>,
) -> AppResult<Json<BankQuestions>> {
    let bank = find_bank(&state, &source_file).await?;
    ensure_accessible(&state, &bank, auth.user_id).await?;

    let mcqs = QuestionBankRepo::questions(&state.pool, bank.id).await?;
    Ok(Json(BankQuestions {
        status: "success",
        mcqs,
    }))
}

/// POST /api/questionbank/save-progress
pub async fn save_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SaveProgress>,
) -> AppResult<Json<DataResponse<BankProgress>>> {
    if input.source_file.trim().is_empty() {
        return Err(AppError::BadRequest("sourceFile is required".into()));
    }
    if input.last_index < 0 {
        return Err(AppError::BadRequest("lastIndex must not be negative".into()));
    }

    let bank = find_bank(&state, &input.source_file).await?;
    ensure_accessible(&state, &bank, auth.user_id).await?;
    let progress = QuestionBankRepo::save_progress(
        &state.pool,
        bank.id,
        auth.user_id,
        input.last_index,
        &input.answered_questions,
        Utc::now(),
    )
    .await?;
    tracing::debug!(
        bank_id = bank.id,
        user_id = auth.user_id,
        last_index = input.last_index,
        answers = input.answered_questions.len(),
        "Question bank progress saved"
    );
    Ok(Json(DataResponse { data: progress }))
}

/// GET /api/questionbank/{source_file}/progress
///
/// A user with no saved progress gets index 0 and no answers.
pub async fn get_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(source_file): Path<String>,
) -> AppResult<Json<DataResponse<ProgressDetail>>> {
    let bank = find_bank(&state, &source_file).await?;
    ensure_accessible(&state, &bank, auth.user_id).await?;
    let progress = QuestionBankRepo::find_progress(&state.pool, bank.id, auth.user_id).await?;
    let answered_questions = QuestionBankRepo::answers(&state.pool, bank.id, auth.user_id).await?;

    Ok(Json(DataResponse {
        data: ProgressDetail {
            source_file: bank.source_file,
            last_index: progress.map_or(0, |p| p.last_index),
            answered_questions,
        },
    }))
}
