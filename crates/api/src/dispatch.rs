//! Recording and sending generation jobs.
//!
//! A job row is written before anything is sent, so a lost request or a
//! lost callback always leaves a `submitted` (later `timed_out`) record the
//! sweep can retry. The stored payload omits the job id; it is filled in
//! each time the job is sent.

use std::sync::Arc;

use chrono::Utc;
use quizdeck_core::generation::{RetryPolicy, JOB_KIND_CHAPTER, JOB_KIND_SIMILAR};
use quizdeck_core::types::{DbId, Timestamp};
use quizdeck_db::models::generation_job::{GenerationJob, NewGenerationJob};
use quizdeck_db::repositories::GenerationJobRepo;
use quizdeck_generation::types::{ChapterGenerationRequest, SimilarQuestionRequest};
use quizdeck_generation::{GenerationApiError, GenerationGateway};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Stored job payload is invalid: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] GenerationApiError),

    #[error("Unknown job kind '{0}'")]
    UnknownKind(String),
}

/// Deadline for a job submitted at `now`.
pub fn deadline_from(now: Timestamp, policy: &RetryPolicy) -> Timestamp {
    let timeout = chrono::Duration::from_std(policy.timeout)
        .unwrap_or_else(|_| chrono::Duration::seconds(900));
    now + timeout
}

/// Insert a `submitted` job row for `payload`.
pub async fn record_job<T: Serialize>(
    pool: &PgPool,
    kind: &'static str,
    chapter_id: DbId,
    requested_by: DbId,
    question_id: Option<DbId>,
    payload: &T,
    policy: &RetryPolicy,
) -> AppResult<GenerationJob> {
    let payload = serde_json::to_value(payload)
        .map_err(|e| AppError::InternalError(format!("Failed to encode job payload: {e}")))?;
    let job = GenerationJobRepo::create(
        pool,
        &NewGenerationJob {
            kind,
            chapter_id,
            requested_by: Some(requested_by),
            question_id,
            payload,
            deadline_at: deadline_from(Utc::now(), policy),
        },
    )
    .await?;
    tracing::info!(job_id = job.id, kind, chapter_id, "Generation job recorded");
    Ok(job)
}

/// Send a job's stored request to the generation service.
pub async fn send(gateway: &dyn GenerationGateway, job: &GenerationJob) -> Result<(), DispatchError> {
    match job.kind.as_str() {
        JOB_KIND_CHAPTER => {
            let mut request: ChapterGenerationRequest =
                serde_json::from_value(job.payload.clone())?;
            request.job_id = Some(job.id);
            gateway.submit_chapter(&request).await?;
        }
        JOB_KIND_SIMILAR => {
            let mut request: SimilarQuestionRequest = serde_json::from_value(job.payload.clone())?;
            request.job_id = Some(job.id);
            gateway.submit_similar(&request).await?;
        }
        other => return Err(DispatchError::UnknownKind(other.to_string())),
    }
    Ok(())
}

/// Send a job in the background. A failed send marks the job `failed`
/// so the sweep picks it up.
pub fn spawn_send(pool: PgPool, gateway: Arc<dyn GenerationGateway>, job: GenerationJob) {
    tokio::spawn(async move {
        if let Err(e) = send(gateway.as_ref(), &job).await {
            tracing::warn!(job_id = job.id, error = %e, "Generation request failed");
            if let Err(db_err) = GenerationJobRepo::mark_failed(&pool, job.id, &e.to_string()).await
            {
                tracing::error!(job_id = job.id, error = %db_err, "Failed to mark job failed");
            }
        }
    });
}
