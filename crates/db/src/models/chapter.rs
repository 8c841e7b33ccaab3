//! Chapter model and DTOs.

use quizdeck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::notebook::PermissionEntry;

/// A row from the `chapters` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: DbId,
    pub notebook_id: DbId,
    pub title: String,
    pub content: String,
    pub question_style: String,
    pub num_questions: i32,
    pub strategic_mode: bool,
    pub intro_questions: bool,
    pub statements: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A chapter with its permission snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDetail {
    #[serde(flatten)]
    pub chapter: Chapter,
    pub permissions: Vec<PermissionEntry>,
}

/// Fields for a new chapter, assembled from the multipart upload.
#[derive(Debug, Clone)]
pub struct CreateChapter {
    pub title: String,
    pub content: String,
    pub question_style: String,
    pub num_questions: i32,
    pub strategic_mode: bool,
    pub intro_questions: bool,
    pub statements: Option<String>,
}

/// DTO for updating a chapter. Omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChapter {
    pub title: Option<String>,
    pub content: Option<String>,
    pub question_style: Option<String>,
    pub strategic_mode: Option<bool>,
    pub intro_questions: Option<bool>,
}
