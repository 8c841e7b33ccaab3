//! Repository for the `incorrect_answers` table.

use quizdeck_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use quizdeck_core::types::DbId;
use sqlx::PgPool;

use crate::models::incorrect_answer::IncorrectAnswer;

const COLUMNS: &str = "id, user_id, question_ref, explanation, created_at";

/// Append-only log of a user's incorrect answers.
pub struct IncorrectAnswerRepo;

impl IncorrectAnswerRepo {
    /// Append an entry to the user's log.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        question_ref: &str,
        explanation: &str,
    ) -> Result<IncorrectAnswer, sqlx::Error> {
        let query = format!(
            "INSERT INTO incorrect_answers (user_id, question_ref, explanation)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IncorrectAnswer>(&query)
            .bind(user_id)
            .bind(question_ref)
            .bind(explanation)
            .fetch_one(pool)
            .await
    }

    /// List a user's log, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<IncorrectAnswer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM incorrect_answers
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, IncorrectAnswer>(&query)
            .bind(user_id)
            .bind(clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT))
            .bind(clamp_offset(offset))
            .fetch_all(pool)
            .await
    }
}
