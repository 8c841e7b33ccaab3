//! Wire types exchanged with the generation service.
//!
//! Field names follow the service's conventions (`ID`, `job_ID`,
//! `answerChoices`, ...), which is why most fields carry explicit renames.

use quizdeck_core::grading::AnswerChoice;
use quizdeck_core::types::{DbId, LooseId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outbound requests
// ---------------------------------------------------------------------------

/// Body of `POST /generate`: produce questions for a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterGenerationRequest {
    /// Chapter id, echoed back as `ID` in the callback.
    #[serde(rename = "ID")]
    pub chapter_id: String,
    /// Job id, echoed back as `job_ID` in the callback.
    #[serde(rename = "job_ID", default)]
    pub job_id: Option<DbId>,
    pub text: String,
    pub num_questions: i32,
    /// Lower-cased question style.
    pub question_style: String,
    pub use_bolding: bool,
    pub intro_questions: bool,
    #[serde(
        rename = "Statements of information",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub statements: Option<String>,
}

/// Body of `POST /similar`: produce a follow-up for a missed question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarQuestionRequest {
    #[serde(rename = "notebook_ID")]
    pub notebook_id: String,
    #[serde(rename = "chapter_ID")]
    pub chapter_id: String,
    #[serde(rename = "user_ID")]
    pub user_id: String,
    #[serde(rename = "question_ID")]
    pub question_id: String,
    #[serde(rename = "job_ID", default)]
    pub job_id: Option<DbId>,
    /// Chapter text the question was generated from.
    pub text: String,
    pub question: String,
    #[serde(rename = "answerChoices")]
    pub answer_choices: Vec<AnswerChoice>,
    pub explanation: Option<String>,
    pub concept: Option<String>,
    pub style: String,
    pub num_questions: i32,
    pub bold: bool,
}

// ---------------------------------------------------------------------------
// Callback payloads
// ---------------------------------------------------------------------------

/// One question produced by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(rename = "answerChoices", default)]
    pub answer_choices: Vec<AnswerChoice>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub concept: Option<String>,
}

/// Body of the `/generatedresponse` callback.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedResponse {
    #[serde(rename = "ID")]
    pub chapter_id: Option<LooseId>,
    #[serde(rename = "job_ID", default)]
    pub job_id: Option<LooseId>,
    #[serde(default)]
    pub questions: Option<Vec<GeneratedQuestion>>,
}

/// Body of the `/similarresponse` callback.
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarResponse {
    #[serde(rename = "notebook_ID", default)]
    pub notebook_id: Option<LooseId>,
    #[serde(rename = "chapter_ID", default)]
    pub chapter_id: Option<LooseId>,
    #[serde(rename = "question_ID", default)]
    pub question_id: Option<LooseId>,
    #[serde(rename = "user_ID", default)]
    pub user_id: Option<LooseId>,
    #[serde(rename = "job_ID", default)]
    pub job_id: Option<LooseId>,
    #[serde(default)]
    pub questions: Option<Vec<GeneratedQuestion>>,
}
