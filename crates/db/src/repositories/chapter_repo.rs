//! Repository for the `chapters` and `chapter_permissions` tables.

use quizdeck_core::permissions::PermissionLevel;
use quizdeck_core::types::DbId;
use sqlx::PgPool;

use crate::models::chapter::{Chapter, CreateChapter, UpdateChapter};
use crate::models::notebook::PermissionEntry;

const COLUMNS: &str = "id, notebook_id, title, content, question_style, num_questions, \
                       strategic_mode, intro_questions, statements, created_at, updated_at";

/// Provides CRUD operations for chapters.
pub struct ChapterRepo;

impl ChapterRepo {
    /// Create a chapter and copy the notebook's current permission list
    /// into the chapter's snapshot, in one transaction.
    pub async fn create(
        pool: &PgPool,
        notebook_id: DbId,
        input: &CreateChapter,
    ) -> Result<Chapter, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO chapters
                (notebook_id, title, content, question_style, num_questions,
                 strategic_mode, intro_questions, statements)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let chapter = sqlx::query_as::<_, Chapter>(&query)
            .bind(notebook_id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(&input.question_style)
            .bind(input.num_questions)
            .bind(input.strategic_mode)
            .bind(input.intro_questions)
            .bind(&input.statements)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO chapter_permissions (chapter_id, user_id, level)
             SELECT $1, user_id, level FROM notebook_permissions WHERE notebook_id = $2",
        )
        .bind(chapter.id)
        .bind(notebook_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE notebooks SET updated_at = NOW() WHERE id = $1")
            .bind(notebook_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(chapter)
    }

    /// Find a chapter by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Chapter>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chapters WHERE id = $1");
        sqlx::query_as::<_, Chapter>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a chapter only if it belongs to the given notebook.
    pub async fn find_in_notebook(
        pool: &PgPool,
        notebook_id: DbId,
        id: DbId,
    ) -> Result<Option<Chapter>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chapters WHERE id = $1 AND notebook_id = $2");
        sqlx::query_as::<_, Chapter>(&query)
            .bind(id)
            .bind(notebook_id)
            .fetch_optional(pool)
            .await
    }

    /// Update a chapter. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateChapter,
    ) -> Result<Option<Chapter>, sqlx::Error> {
        let query = format!(
            "UPDATE chapters SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                question_style = COALESCE($4, question_style),
                strategic_mode = COALESCE($5, strategic_mode),
                intro_questions = COALESCE($6, intro_questions),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Chapter>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(&input.question_style)
            .bind(input.strategic_mode)
            .bind(input.intro_questions)
            .fetch_optional(pool)
            .await
    }

    /// Delete a chapter. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The chapter's permission snapshot.
    pub async fn permissions(
        pool: &PgPool,
        chapter_id: DbId,
    ) -> Result<Vec<PermissionEntry>, sqlx::Error> {
        sqlx::query_as::<_, PermissionEntry>(
            "SELECT user_id, level FROM chapter_permissions
             WHERE chapter_id = $1
             ORDER BY user_id",
        )
        .bind(chapter_id)
        .fetch_all(pool)
        .await
    }

    /// The level the snapshot grants one user, if any.
    pub async fn find_permission(
        pool: &PgPool,
        chapter_id: DbId,
        user_id: DbId,
    ) -> Result<Option<PermissionLevel>, sqlx::Error> {
        let level: Option<String> = sqlx::query_scalar(
            "SELECT level FROM chapter_permissions WHERE chapter_id = $1 AND user_id = $2",
        )
        .bind(chapter_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(level.and_then(|l| l.parse().ok()))
    }
}
