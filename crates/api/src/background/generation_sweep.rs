//! Detects lost generation callbacks and retries the jobs.
//!
//! Each pass first moves `submitted` jobs past their deadline to
//! `timed_out`, then resubmits timed-out and failed jobs that still have
//! attempts left. Jobs at the attempt cap stay as they are.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use quizdeck_core::generation::RetryPolicy;
use quizdeck_core::types::Timestamp;
use quizdeck_db::repositories::GenerationJobRepo;
use quizdeck_generation::GenerationGateway;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::dispatch;

/// Upper bound on jobs resubmitted per pass.
const RETRY_BATCH: i64 = 50;

/// What one pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: u64,
    pub resubmitted: usize,
    pub failed: usize,
}

pub async fn run_once(
    pool: &PgPool,
    gateway: &dyn GenerationGateway,
    policy: &RetryPolicy,
    now: Timestamp,
) -> Result<SweepReport, sqlx::Error> {
    let mut report = SweepReport {
        expired: GenerationJobRepo::expire_overdue(pool, now).await?,
        ..SweepReport::default()
    };

    let candidates = GenerationJobRepo::list_retryable(pool, policy.max_attempts, RETRY_BATCH).await?;
    for candidate in candidates {
        if !policy.can_retry(&candidate.status, candidate.attempts) {
            continue;
        }
        let deadline = dispatch::deadline_from(now, policy);
        let Some(job) = GenerationJobRepo::resubmit(pool, candidate.id, deadline).await? else {
            continue;
        };

        match dispatch::send(gateway, &job).await {
            Ok(()) => {
                tracing::info!(job_id = job.id, attempts = job.attempts, "Generation job resubmitted");
                report.resubmitted += 1;
            }
            Err(e) => {
                tracing::warn!(job_id = job.id, attempts = job.attempts, error = %e, "Generation retry failed");
                GenerationJobRepo::mark_failed(pool, job.id, &e.to_string()).await?;
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Run the sweep every `interval` until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    gateway: Arc<dyn GenerationGateway>,
    policy: RetryPolicy,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        timeout_secs = policy.timeout.as_secs(),
        max_attempts = policy.max_attempts,
        "Generation sweep started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Generation sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match run_once(&pool, gateway.as_ref(), &policy, Utc::now()).await {
                    Ok(report) if report == SweepReport::default() => {
                        tracing::debug!("Generation sweep: nothing to do");
                    }
                    Ok(report) => tracing::info!(
                        expired = report.expired,
                        resubmitted = report.resubmitted,
                        failed = report.failed,
                        "Generation sweep completed"
                    ),
                    Err(e) => tracing::error!(error = %e, "Generation sweep failed"),
                }
            }
        }
    }
}
