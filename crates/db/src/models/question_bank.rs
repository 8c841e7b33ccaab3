//! Question bank models: the bank, its questions, enrollment and progress.

use quizdeck_core::grading::AnswerChoice;
use quizdeck_core::types::{DbId, LooseId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Bank
// ---------------------------------------------------------------------------

/// A row from the `question_banks` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBank {
    pub id: DbId,
    pub source_file: String,
    pub title: String,
    pub description: String,
    pub creator_id: Option<DbId>,
    pub url_slug: Option<String>,
    pub price_cents: i32,
    pub is_public: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QuestionBank {
    /// Priced banks are only readable by enrolled users and the creator.
    pub fn requires_enrollment(&self) -> bool {
        self.price_cents > 0
    }
}

/// A bank listing row with aggregate fields.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBankSummary {
    pub id: DbId,
    pub source_file: String,
    pub title: String,
    pub description: String,
    pub url_slug: Option<String>,
    pub price_cents: i32,
    pub is_public: bool,
    pub question_count: i64,
    pub enrolled: bool,
}

/// A row from the `question_bank_questions` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BankQuestion {
    pub id: DbId,
    pub bank_id: DbId,
    pub external_ref: Option<String>,
    pub question: String,
    pub answer_choices: Json<Vec<AnswerChoice>>,
    pub explanation: Option<String>,
    pub factoid: Option<String>,
    pub position: i32,
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// One question in an import payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuestion {
    pub id: Option<LooseId>,
    pub question: String,
    #[serde(default)]
    pub answer_choices: Vec<AnswerChoice>,
    pub explanation: Option<String>,
    pub factoid: Option<String>,
}

/// DTO for `POST /questionbank/import`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuestionBank {
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub questions: Vec<ImportQuestion>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url_slug: Option<String>,
    pub price_cents: Option<i32>,
    pub is_public: Option<bool>,
}

/// Default bank title: the source file name up to its first dot.
pub fn title_from_source_file(source_file: &str) -> String {
    source_file
        .split('.')
        .next()
        .unwrap_or(source_file)
        .to_string()
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// A row from the `question_bank_progress` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BankProgress {
    pub bank_id: DbId,
    pub user_id: DbId,
    pub last_index: i32,
    pub updated_at: Timestamp,
}

/// A row from the `question_bank_answers` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BankAnswer {
    pub question_ref: String,
    pub correct: bool,
    pub answered_at: Timestamp,
}

/// Progress plus the merged answer list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDetail {
    pub source_file: String,
    pub last_index: i32,
    pub answered_questions: Vec<BankAnswer>,
}

/// One answered question in a save-progress payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    pub question_id: LooseId,
    pub correct: bool,
    pub answered_at: Option<Timestamp>,
}

/// DTO for `POST /questionbank/save-progress`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgress {
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub last_index: i32,
    #[serde(default)]
    pub answered_questions: Vec<AnsweredQuestion>,
}
