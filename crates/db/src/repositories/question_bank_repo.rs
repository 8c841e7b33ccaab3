//! Repository for question banks, their questions, enrollments and progress.

use quizdeck_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::question_bank::{
    title_from_source_file, AnsweredQuestion, BankAnswer, BankProgress, BankQuestion,
    ImportQuestionBank, QuestionBank, QuestionBankSummary,
};

const COLUMNS: &str = "id, source_file, title, description, creator_id, url_slug, \
                       price_cents, is_public, created_at, updated_at";

const QUESTION_COLUMNS: &str =
    "id, bank_id, external_ref, question, answer_choices, explanation, factoid, position";

/// Provides access to question banks.
pub struct QuestionBankRepo;

impl QuestionBankRepo {
    // ---- banks ----

    /// Find a bank by its unique source-file key.
    pub async fn find_by_source_file(
        pool: &PgPool,
        source_file: &str,
    ) -> Result<Option<QuestionBank>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM question_banks WHERE source_file = $1");
        sqlx::query_as::<_, QuestionBank>(&query)
            .bind(source_file)
            .fetch_optional(pool)
            .await
    }

    /// Find a bank by the product slug used in checkout metadata.
    pub async fn find_by_url_slug(
        pool: &PgPool,
        url_slug: &str,
    ) -> Result<Option<QuestionBank>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM question_banks WHERE url_slug = $1");
        sqlx::query_as::<_, QuestionBank>(&query)
            .bind(url_slug)
            .fetch_optional(pool)
            .await
    }

    /// Import questions into the bank keyed by `source_file`, creating the
    /// bank if it does not exist. New questions are appended after any
    /// existing ones. Metadata supplied in the payload overwrites the stored
    /// values; omitted metadata is left as is.
    ///
    /// An existing bank is only touched when `creator_id` created it (or it
    /// has no creator, in which case the importer claims it). Otherwise
    /// nothing is written and `None` is returned.
    ///
    /// Returns the bank and its total question count.
    pub async fn import(
        pool: &PgPool,
        creator_id: DbId,
        input: &ImportQuestionBank,
    ) -> Result<Option<(QuestionBank, i64)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let default_title = title_from_source_file(&input.source_file);
        let query = format!(
            "INSERT INTO question_banks
                (source_file, title, description, creator_id, url_slug, price_cents, is_public)
             VALUES ($1, COALESCE($2, $3), COALESCE($4, ''), $5, $6, COALESCE($7, 0), COALESCE($8, TRUE))
             ON CONFLICT (source_file) DO UPDATE SET
                title = COALESCE($2, question_banks.title),
                description = COALESCE($4, question_banks.description),
                url_slug = COALESCE($6, question_banks.url_slug),
                price_cents = COALESCE($7, question_banks.price_cents),
                is_public = COALESCE($8, question_banks.is_public),
                creator_id = COALESCE(question_banks.creator_id, $5),
                updated_at = NOW()
             WHERE question_banks.creator_id IS NULL OR question_banks.creator_id = $5
             RETURNING {COLUMNS}"
        );
        let bank = sqlx::query_as::<_, QuestionBank>(&query)
            .bind(&input.source_file)
            .bind(&input.title)
            .bind(&default_title)
            .bind(&input.description)
            .bind(creator_id)
            .bind(&input.url_slug)
            .bind(input.price_cents)
            .bind(input.is_public)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(bank) = bank else {
            return Ok(None);
        };

        let next_position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM question_bank_questions WHERE bank_id = $1",
        )
        .bind(bank.id)
        .fetch_one(&mut *tx)
        .await?;

        for (offset, q) in input.questions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO question_bank_questions
                    (bank_id, external_ref, question, answer_choices, explanation, factoid, position)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(bank.id)
            .bind(q.id.as_ref().map(|id| id.to_key()))
            .bind(&q.question)
            .bind(Json(&q.answer_choices))
            .bind(&q.explanation)
            .bind(&q.factoid)
            .bind(next_position + offset as i32)
            .execute(&mut *tx)
            .await?;
        }

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM question_bank_questions WHERE bank_id = $1")
                .bind(bank.id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(Some((bank, count)))
    }

    /// Banks a user can see: public ones, ones they are enrolled in, and
    /// ones they created.
    pub async fn list_visible(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<QuestionBankSummary>, sqlx::Error> {
        sqlx::query_as::<_, QuestionBankSummary>(
            "SELECT b.id, b.source_file, b.title, b.description, b.url_slug, b.price_cents,
                    b.is_public,
                    (SELECT COUNT(*) FROM question_bank_questions q WHERE q.bank_id = b.id)
                        AS question_count,
                    EXISTS (
                        SELECT 1 FROM question_bank_enrollments e
                        WHERE e.bank_id = b.id AND e.user_id = $1
                    ) AS enrolled
             FROM question_banks b
             WHERE b.is_public
                OR b.creator_id = $1
                OR EXISTS (
                    SELECT 1 FROM question_bank_enrollments e
                    WHERE e.bank_id = b.id AND e.user_id = $1
                )
             ORDER BY b.title, b.id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// All questions of a bank in import order.
    pub async fn questions(
        pool: &PgPool,
        bank_id: DbId,
    ) -> Result<Vec<BankQuestion>, sqlx::Error> {
        let query = format!(
            "SELECT {QUESTION_COLUMNS} FROM question_bank_questions
             WHERE bank_id = $1
             ORDER BY position, id"
        );
        sqlx::query_as::<_, BankQuestion>(&query)
            .bind(bank_id)
            .fetch_all(pool)
            .await
    }

    // ---- enrollment ----

    /// Whether the user is in the bank's enrolled set.
    pub async fn is_enrolled(
        pool: &PgPool,
        bank_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM question_bank_enrollments WHERE bank_id = $1 AND user_id = $2
             )",
        )
        .bind(bank_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Add the user to the bank's enrolled set.
    ///
    /// Returns `true` only when the user was not already enrolled, so a
    /// redelivered purchase event can be detected.
    pub async fn enroll(pool: &PgPool, bank_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO question_bank_enrollments (bank_id, user_id)
             VALUES ($1, $2)
             ON CONFLICT (bank_id, user_id) DO NOTHING",
        )
        .bind(bank_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- progress ----

    /// Record the last index reached and merge answered questions.
    ///
    /// Answers are keyed by question reference; a later answer to the same
    /// question replaces the earlier one.
    pub async fn save_progress(
        pool: &PgPool,
        bank_id: DbId,
        user_id: DbId,
        last_index: i32,
        answers: &[AnsweredQuestion],
        now: Timestamp,
    ) -> Result<BankProgress, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let progress = sqlx::query_as::<_, BankProgress>(
            "INSERT INTO question_bank_progress (bank_id, user_id, last_index)
             VALUES ($1, $2, $3)
             ON CONFLICT (bank_id, user_id) DO UPDATE SET
                last_index = EXCLUDED.last_index,
                updated_at = NOW()
             RETURNING bank_id, user_id, last_index, updated_at",
        )
        .bind(bank_id)
        .bind(user_id)
        .bind(last_index)
        .fetch_one(&mut *tx)
        .await?;

        for answer in answers {
            sqlx::query(
                "INSERT INTO question_bank_answers (bank_id, user_id, question_ref, correct, answered_at)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (bank_id, user_id, question_ref) DO UPDATE SET
                    correct = EXCLUDED.correct,
                    answered_at = EXCLUDED.answered_at",
            )
            .bind(bank_id)
            .bind(user_id)
            .bind(answer.question_id.to_key())
            .bind(answer.correct)
            .bind(answer.answered_at.unwrap_or(now))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(progress)
    }

    /// The user's progress record for a bank, if any.
    pub async fn find_progress(
        pool: &PgPool,
        bank_id: DbId,
        user_id: DbId,
    ) -> Result<Option<BankProgress>, sqlx::Error> {
        sqlx::query_as::<_, BankProgress>(
            "SELECT bank_id, user_id, last_index, updated_at FROM question_bank_progress
             WHERE bank_id = $1 AND user_id = $2",
        )
        .bind(bank_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// The user's answered questions for a bank, oldest first.
    pub async fn answers(
        pool: &PgPool,
        bank_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<BankAnswer>, sqlx::Error> {
        sqlx::query_as::<_, BankAnswer>(
            "SELECT question_ref, correct, answered_at FROM question_bank_answers
             WHERE bank_id = $1 AND user_id = $2
             ORDER BY answered_at, question_ref",
        )
        .bind(bank_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
