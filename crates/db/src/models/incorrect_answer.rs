//! Per-user incorrect answer log.

use quizdeck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `incorrect_answers` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IncorrectAnswer {
    pub id: DbId,
    pub user_id: DbId,
    pub question_ref: String,
    pub explanation: String,
    pub created_at: Timestamp,
}

/// DTO for logging an incorrect answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncorrectAnswer {
    pub mcq_id: String,
    #[serde(default)]
    pub factoid: String,
}
