//! Shortened share links granting notebook access.

use quizdeck_core::permissions::PermissionLevel;
use quizdeck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `share_links` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub id: DbId,
    pub token: String,
    pub notebook_id: DbId,
    pub access_level: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

/// DTO for creating a share link.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareLink {
    pub access_level: PermissionLevel,
}
