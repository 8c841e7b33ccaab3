//! Chapter question model.

use quizdeck_core::grading::AnswerChoice;
use quizdeck_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `questions` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: DbId,
    pub chapter_id: DbId,
    pub question: String,
    pub answer_choices: Json<Vec<AnswerChoice>>,
    pub explanation: Option<String>,
    pub concept: Option<String>,
    /// `None` for questions every reader sees.
    pub created_for_user: Option<DbId>,
    pub source_question_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A question to insert, produced by the generation service.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question: String,
    pub answer_choices: Vec<AnswerChoice>,
    pub explanation: Option<String>,
    pub concept: Option<String>,
}

/// A question paired with the caller's latest response to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionWithResponse {
    pub question: Question,
    pub user_response: Option<String>,
    pub flagged: bool,
}
