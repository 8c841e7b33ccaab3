//! Per-user answers to chapter questions.

use quizdeck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `user_responses` table. One row per (user, question).
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: DbId,
    pub user_id: DbId,
    pub question_id: DbId,
    pub selected_answer: String,
    pub flagged: bool,
    pub correct: bool,
    pub consecutive_correct: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting an answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub selected_answer: String,
    #[serde(default)]
    pub flagged: bool,
}
