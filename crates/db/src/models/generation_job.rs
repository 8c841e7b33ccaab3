//! Generation job records.

use quizdeck_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: DbId,
    pub kind: String,
    pub chapter_id: DbId,
    pub requested_by: Option<DbId>,
    pub question_id: Option<DbId>,
    pub status: String,
    pub attempts: i32,
    #[serde(skip_serializing)]
    pub payload: serde_json::Value,
    pub last_error: Option<String>,
    pub submitted_at: Timestamp,
    pub deadline_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Fields for a new job record.
#[derive(Debug, Clone)]
pub struct NewGenerationJob {
    pub kind: &'static str,
    pub chapter_id: DbId,
    pub requested_by: Option<DbId>,
    pub question_id: Option<DbId>,
    /// The outbound request body; the job id is filled in at dispatch time.
    pub payload: serde_json::Value,
    pub deadline_at: Timestamp,
}
