//! Repository for the `notebooks` and `notebook_permissions` tables.

use quizdeck_core::permissions::PermissionLevel;
use quizdeck_core::types::DbId;
use sqlx::PgPool;

use crate::models::notebook::{ChapterSummary, Notebook, PermissionEntry, UpdateNotebook};

const COLUMNS: &str = "id, owner_id, title, created_at, updated_at";

/// Provides CRUD operations for notebooks and their permission lists.
pub struct NotebookRepo;

impl NotebookRepo {
    /// Create a notebook and give its owner an `admin` permission entry.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        title: &str,
    ) -> Result<Notebook, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO notebooks (owner_id, title)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        let notebook = sqlx::query_as::<_, Notebook>(&query)
            .bind(owner_id)
            .bind(title)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO notebook_permissions (notebook_id, user_id, level)
             VALUES ($1, $2, $3)",
        )
        .bind(notebook.id)
        .bind(owner_id)
        .bind(PermissionLevel::Admin.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(notebook)
    }

    /// Find a notebook by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Notebook>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notebooks WHERE id = $1");
        sqlx::query_as::<_, Notebook>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List notebooks the user owns or appears in the permission list of.
    pub async fn list_accessible(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Notebook>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notebooks n
             WHERE n.owner_id = $1
                OR EXISTS (
                    SELECT 1 FROM notebook_permissions p
                    WHERE p.notebook_id = n.id AND p.user_id = $1
                )
             ORDER BY n.updated_at DESC, n.id DESC"
        );
        sqlx::query_as::<_, Notebook>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Update a notebook. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateNotebook,
    ) -> Result<Option<Notebook>, sqlx::Error> {
        let query = format!(
            "UPDATE notebooks SET
                title = COALESCE($2, title),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notebook>(&query)
            .bind(id)
            .bind(&input.title)
            .fetch_optional(pool)
            .await
    }

    /// Delete a notebook and, by cascade, its chapters and questions.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notebooks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- permissions ----

    /// The notebook's permission list, in grant order.
    pub async fn permissions(
        pool: &PgPool,
        notebook_id: DbId,
    ) -> Result<Vec<PermissionEntry>, sqlx::Error> {
        sqlx::query_as::<_, PermissionEntry>(
            "SELECT user_id, level FROM notebook_permissions
             WHERE notebook_id = $1
             ORDER BY granted_at, user_id",
        )
        .bind(notebook_id)
        .fetch_all(pool)
        .await
    }

    /// The level granted to one user, if any.
    pub async fn find_permission(
        pool: &PgPool,
        notebook_id: DbId,
        user_id: DbId,
    ) -> Result<Option<PermissionLevel>, sqlx::Error> {
        let level: Option<String> = sqlx::query_scalar(
            "SELECT level FROM notebook_permissions WHERE notebook_id = $1 AND user_id = $2",
        )
        .bind(notebook_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(level.and_then(|l| l.parse().ok()))
    }

    /// Grant a level to a user, replacing any previous level.
    pub async fn grant(
        pool: &PgPool,
        notebook_id: DbId,
        user_id: DbId,
        level: PermissionLevel,
    ) -> Result<PermissionEntry, sqlx::Error> {
        sqlx::query_as::<_, PermissionEntry>(
            "INSERT INTO notebook_permissions (notebook_id, user_id, level)
             VALUES ($1, $2, $3)
             ON CONFLICT (notebook_id, user_id) DO UPDATE SET level = EXCLUDED.level
             RETURNING user_id, level",
        )
        .bind(notebook_id)
        .bind(user_id)
        .bind(level.as_str())
        .fetch_one(pool)
        .await
    }

    /// Remove a user's permission entry. Returns `true` if one existed.
    pub async fn revoke(
        pool: &PgPool,
        notebook_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notebook_permissions WHERE notebook_id = $1 AND user_id = $2",
        )
        .bind(notebook_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- chapter summaries ----

    /// Chapter summaries for a set of notebooks, oldest chapter first.
    pub async fn chapter_summaries(
        pool: &PgPool,
        notebook_ids: &[DbId],
    ) -> Result<Vec<ChapterSummary>, sqlx::Error> {
        sqlx::query_as::<_, ChapterSummary>(
            "SELECT id, title, notebook_id FROM chapters
             WHERE notebook_id = ANY($1)
             ORDER BY notebook_id, created_at, id",
        )
        .bind(notebook_ids)
        .fetch_all(pool)
        .await
    }
}
