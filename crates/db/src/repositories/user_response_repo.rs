//! Repository for the `user_responses` table.

use quizdeck_core::types::DbId;
use sqlx::PgPool;

use crate::models::user_response::UserResponse;

const COLUMNS: &str = "id, user_id, question_id, selected_answer, flagged, correct, \
                       consecutive_correct, created_at, updated_at";

/// Records the latest answer each user gave to each question.
pub struct UserResponseRepo;

impl UserResponseRepo {
    /// Insert or replace the user's answer to a question.
    ///
    /// The consecutive-correct streak grows on a correct answer and resets
    /// to zero on an incorrect one.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        question_id: DbId,
        selected_answer: &str,
        flagged: bool,
        correct: bool,
    ) -> Result<UserResponse, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_responses
                (user_id, question_id, selected_answer, flagged, correct, consecutive_correct)
             VALUES ($1, $2, $3, $4, $5, CASE WHEN $5 THEN 1 ELSE 0 END)
             ON CONFLICT (user_id, question_id) DO UPDATE SET
                selected_answer = EXCLUDED.selected_answer,
                flagged = EXCLUDED.flagged,
                correct = EXCLUDED.correct,
                consecutive_correct = CASE
                    WHEN EXCLUDED.correct THEN user_responses.consecutive_correct + 1
                    ELSE 0
                END,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserResponse>(&query)
            .bind(user_id)
            .bind(question_id)
            .bind(selected_answer)
            .bind(flagged)
            .bind(correct)
            .fetch_one(pool)
            .await
    }

    /// The user's responses to every question of a chapter.
    pub async fn list_for_chapter(
        pool: &PgPool,
        user_id: DbId,
        chapter_id: DbId,
    ) -> Result<Vec<UserResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_responses r
             WHERE r.user_id = $1
               AND r.question_id IN (SELECT id FROM questions WHERE chapter_id = $2)"
        );
        sqlx::query_as::<_, UserResponse>(&query)
            .bind(user_id)
            .bind(chapter_id)
            .fetch_all(pool)
            .await
    }
}
