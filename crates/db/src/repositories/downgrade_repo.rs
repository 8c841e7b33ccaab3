//! Repository for the `scheduled_downgrades` table.
//!
//! A row means "move this user to the free plan at `downgrade_at`". The
//! periodic sweep applies due rows; payment events create or clear them.

use quizdeck_core::types::{DbId, Timestamp};
use sqlx::PgPool;

/// Durable downgrade schedule.
pub struct DowngradeRepo;

impl DowngradeRepo {
    /// Schedule (or reschedule) a user's downgrade.
    pub async fn schedule(
        pool: &PgPool,
        user_id: DbId,
        downgrade_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO scheduled_downgrades (user_id, downgrade_at)
             VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET downgrade_at = EXCLUDED.downgrade_at",
        )
        .bind(user_id)
        .bind(downgrade_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove a pending downgrade. Returns `true` if one existed.
    pub async fn cancel(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scheduled_downgrades WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Consume every downgrade due at `now` and set those users to free.
    ///
    /// Runs as one statement so a row is never consumed without its user
    /// being downgraded. Returns the ids of the downgraded users.
    pub async fn apply_due(pool: &PgPool, now: Timestamp) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "WITH due AS (
                DELETE FROM scheduled_downgrades
                WHERE downgrade_at <= $1
                RETURNING user_id
             )
             UPDATE users SET plan = 'free', updated_at = NOW()
             WHERE id IN (SELECT user_id FROM due)
             RETURNING id",
        )
        .bind(now)
        .fetch_all(pool)
        .await
    }
}
