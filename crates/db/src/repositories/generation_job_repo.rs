//! Repository for the `generation_jobs` table.
//!
//! Status transitions are guarded in SQL so a late callback cannot
//! resurrect a job and a retry cannot touch a fulfilled one.

use quizdeck_core::generation::{
    JOB_STATUS_FAILED, JOB_STATUS_FULFILLED, JOB_STATUS_SUBMITTED, JOB_STATUS_TIMED_OUT,
};
use quizdeck_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::generation_job::{GenerationJob, NewGenerationJob};

const COLUMNS: &str = "id, kind, chapter_id, requested_by, question_id, status, attempts, \
                       payload, last_error, submitted_at, deadline_at, completed_at";

/// Tracks requests sent to the remote generation service.
pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Record a newly submitted job.
    pub async fn create(
        pool: &PgPool,
        input: &NewGenerationJob,
    ) -> Result<GenerationJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs
                (kind, chapter_id, requested_by, question_id, status, payload, deadline_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(input.kind)
            .bind(input.chapter_id)
            .bind(input.requested_by)
            .bind(input.question_id)
            .bind(JOB_STATUS_SUBMITTED)
            .bind(&input.payload)
            .bind(input.deadline_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Jobs for a chapter, newest first.
    pub async fn list_for_chapter(
        pool: &PgPool,
        chapter_id: DbId,
    ) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs
             WHERE chapter_id = $1
             ORDER BY submitted_at DESC, id DESC"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(chapter_id)
            .fetch_all(pool)
            .await
    }

    /// Mark a specific job fulfilled, provided it belongs to `chapter_id`.
    ///
    /// A timed-out job whose result arrives late is still accepted.
    /// Returns `None` when the job is unknown, belongs elsewhere, or was
    /// already fulfilled.
    pub async fn fulfil(
        pool: &PgPool,
        id: DbId,
        chapter_id: DbId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs SET status = $3, completed_at = NOW(), last_error = NULL
             WHERE id = $1 AND chapter_id = $2 AND status <> $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(chapter_id)
            .bind(JOB_STATUS_FULFILLED)
            .fetch_optional(pool)
            .await
    }

    /// Fulfil the oldest unfulfilled job of `kind` for a chapter.
    ///
    /// Used when the callback does not echo a job id. For `similar` jobs the
    /// search is narrowed to the requesting user when known.
    pub async fn fulfil_oldest_open(
        pool: &PgPool,
        chapter_id: DbId,
        kind: &str,
        requested_by: Option<DbId>,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs SET status = $4, completed_at = NOW(), last_error = NULL
             WHERE id = (
                SELECT id FROM generation_jobs
                WHERE chapter_id = $1 AND kind = $2 AND status <> $4
                  AND ($3::BIGINT IS NULL OR requested_by = $3)
                ORDER BY submitted_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(chapter_id)
            .bind(kind)
            .bind(requested_by)
            .bind(JOB_STATUS_FULFILLED)
            .fetch_optional(pool)
            .await
    }

    /// Mark a submitted job failed after the outbound request errored.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_jobs SET status = $2, last_error = $3
             WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(JOB_STATUS_FAILED)
        .bind(error)
        .bind(JOB_STATUS_SUBMITTED)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Move every submitted job whose deadline has passed to `timed_out`.
    ///
    /// Returns the number of jobs expired.
    pub async fn expire_overdue(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs SET status = $2, last_error = 'No callback before deadline'
             WHERE status = $1 AND deadline_at <= $3",
        )
        .bind(JOB_STATUS_SUBMITTED)
        .bind(JOB_STATUS_TIMED_OUT)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Timed-out or failed jobs that have attempts left, oldest first.
    pub async fn list_retryable(
        pool: &PgPool,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs
             WHERE status IN ($1, $2) AND attempts < $3
             ORDER BY submitted_at, id
             LIMIT $4"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(JOB_STATUS_TIMED_OUT)
            .bind(JOB_STATUS_FAILED)
            .bind(max_attempts)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Put a timed-out or failed job back into `submitted` with a fresh
    /// deadline, counting the attempt.
    ///
    /// Returns `None` if the job was fulfilled or resubmitted concurrently.
    pub async fn resubmit(
        pool: &PgPool,
        id: DbId,
        deadline_at: Timestamp,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs SET
                status = $3,
                attempts = attempts + 1,
                submitted_at = NOW(),
                deadline_at = $2
             WHERE id = $1 AND status IN ($4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(deadline_at)
            .bind(JOB_STATUS_SUBMITTED)
            .bind(JOB_STATUS_TIMED_OUT)
            .bind(JOB_STATUS_FAILED)
            .fetch_optional(pool)
            .await
    }
}
