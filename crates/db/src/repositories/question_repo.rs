//! Repository for the `questions` table.

use quizdeck_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::question::{NewQuestion, Question};

const COLUMNS: &str = "id, chapter_id, question, answer_choices, explanation, concept, \
                       created_for_user, source_question_id, created_at";

/// Provides access to chapter questions.
pub struct QuestionRepo;

impl QuestionRepo {
    /// Append questions to a chapter in one transaction.
    ///
    /// `created_for_user` scopes the questions to a single reader;
    /// `source_question_id` links follow-ups to the question that was missed.
    pub async fn append(
        pool: &PgPool,
        chapter_id: DbId,
        created_for_user: Option<DbId>,
        source_question_id: Option<DbId>,
        questions: &[NewQuestion],
    ) -> Result<Vec<Question>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut results = Vec::with_capacity(questions.len());

        let query = format!(
            "INSERT INTO questions
                (chapter_id, question, answer_choices, explanation, concept,
                 created_for_user, source_question_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );

        for q in questions {
            let row = sqlx::query_as::<_, Question>(&query)
                .bind(chapter_id)
                .bind(&q.question)
                .bind(Json(&q.answer_choices))
                .bind(&q.explanation)
                .bind(&q.concept)
                .bind(created_for_user)
                .bind(source_question_id)
                .fetch_one(&mut *tx)
                .await?;
            results.push(row);
        }

        tx.commit().await?;
        Ok(results)
    }

    /// Find a question by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Question>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM questions WHERE id = $1");
        sqlx::query_as::<_, Question>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Questions of a chapter visible to a user: general ones plus those
    /// generated for that user, in insertion order.
    pub async fn list_visible(
        pool: &PgPool,
        chapter_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<Question>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM questions
             WHERE chapter_id = $1
               AND (created_for_user IS NULL OR created_for_user = $2)
             ORDER BY id"
        );
        sqlx::query_as::<_, Question>(&query)
            .bind(chapter_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Count questions in a chapter.
    pub async fn count_for_chapter(pool: &PgPool, chapter_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE chapter_id = $1")
            .bind(chapter_id)
            .fetch_one(pool)
            .await
    }
}
