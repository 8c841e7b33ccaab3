//! Repository for the `share_links` table.

use quizdeck_core::permissions::PermissionLevel;
use quizdeck_core::types::DbId;
use sqlx::PgPool;

use crate::models::share_link::ShareLink;

const COLUMNS: &str = "id, token, notebook_id, access_level, created_by, created_at";

pub struct ShareLinkRepo;

impl ShareLinkRepo {
    pub async fn create(
        pool: &PgPool,
        token: &str,
        notebook_id: DbId,
        access_level: PermissionLevel,
        created_by: DbId,
    ) -> Result<ShareLink, sqlx::Error> {
        let query = format!(
            "INSERT INTO share_links (token, notebook_id, access_level, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ShareLink>(&query)
            .bind(token)
            .bind(notebook_id)
            .bind(access_level.as_str())
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<ShareLink>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM share_links WHERE token = $1");
        sqlx::query_as::<_, ShareLink>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }
}
