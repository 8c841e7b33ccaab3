//! Applies scheduled plan downgrades once their time has come.
//!
//! Cancelled subscriptions keep premium until the paid period ends. The
//! webhook records the end as a `scheduled_downgrades` row; this loop
//! consumes due rows, so a restart between the two never loses one.

use std::time::Duration;

use chrono::Utc;
use quizdeck_core::types::Timestamp;
use quizdeck_db::repositories::DowngradeRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Downgrade every user whose scheduled time is at or before `now`.
///
/// Returns the number of users downgraded.
pub async fn run_once(pool: &PgPool, now: Timestamp) -> Result<usize, sqlx::Error> {
    let users = DowngradeRepo::apply_due(pool, now).await?;
    for user_id in &users {
        tracing::info!(user_id, "Scheduled downgrade applied, user moved to free plan");
    }
    Ok(users.len())
}

/// Run the sweep every `interval` until `cancel` is triggered.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Downgrade sweep started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Downgrade sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match run_once(&pool, Utc::now()).await {
                    Ok(0) => tracing::debug!("Downgrade sweep: nothing due"),
                    Ok(count) => tracing::info!(count, "Downgrade sweep: users downgraded"),
                    Err(e) => tracing::error!(error = %e, "Downgrade sweep failed"),
                }
            }
        }
    }
}
