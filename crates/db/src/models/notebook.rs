//! Notebook model, permission entries and DTOs.

use quizdeck_core::permissions::PermissionLevel;
use quizdeck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notebooks` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One entry of a notebook's (or a chapter snapshot's) permission list.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub user_id: DbId,
    pub level: String,
}

impl PermissionEntry {
    /// Parsed level; unknown values degrade to view-only.
    pub fn level(&self) -> PermissionLevel {
        self.level.parse().unwrap_or(PermissionLevel::ViewOnly)
    }
}

/// Chapter summary embedded in notebook listings.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: DbId,
    pub title: String,
    pub notebook_id: DbId,
}

/// A notebook with its permission list and chapter summaries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookDetail {
    #[serde(flatten)]
    pub notebook: Notebook,
    pub permissions: Vec<PermissionEntry>,
    pub chapters: Vec<ChapterSummary>,
}

/// A notebook with its chapter summaries, as returned by listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookWithChapters {
    #[serde(flatten)]
    pub notebook: Notebook,
    pub chapters: Vec<ChapterSummary>,
}

/// DTO for creating a notebook.
#[derive(Debug, Deserialize)]
pub struct CreateNotebook {
    #[serde(default)]
    pub title: String,
}

/// DTO for updating a notebook.
#[derive(Debug, Deserialize)]
pub struct UpdateNotebook {
    pub title: Option<String>,
}

/// DTO for granting or changing a permission entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermission {
    pub user_id: DbId,
    pub level: PermissionLevel,
}
