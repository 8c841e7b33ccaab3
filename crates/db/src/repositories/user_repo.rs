//! Repository for the `users` table.

use quizdeck_core::plan::Plan;
use quizdeck_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{CreateUser, ExternalProfile, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, google_id, name, email, image, plan, subscription_end_date, \
                       stripe_customer_id, questions_generated_this_month, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user that has no external identity yet.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email, image)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.image)
            .fetch_one(pool)
            .await
    }

    /// Insert a user for an external identity, or return the existing row
    /// when that identity is already linked.
    ///
    /// The conflict target makes concurrent first logins for the same
    /// identity converge on one row.
    pub async fn upsert_by_google_id(
        pool: &PgPool,
        profile: &ExternalProfile,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (google_id, name, email, image)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (google_id) DO UPDATE SET google_id = EXCLUDED.google_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&profile.external_id)
            .bind(&profile.name)
            .bind(&profile.email)
            .bind(&profile.image)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-sensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by the identity provider's subject id.
    pub async fn find_by_google_id(
        pool: &PgPool,
        google_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE google_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(google_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by payment-provider customer reference.
    pub async fn find_by_stripe_customer(
        pool: &PgPool,
        customer_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE stripe_customer_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Attach an external identity to an existing user found by email.
    ///
    /// The profile image is only filled in when the user has none.
    pub async fn link_google_id(
        pool: &PgPool,
        id: DbId,
        profile: &ExternalProfile,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                google_id = $2,
                image = COALESCE(image, $3),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&profile.external_id)
            .bind(&profile.image)
            .fetch_optional(pool)
            .await
    }

    /// Record the payment-provider customer reference for a user.
    pub async fn set_stripe_customer(
        pool: &PgPool,
        id: DbId,
        customer_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET stripe_customer_id = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the plan and, when given, the subscription end date.
    pub async fn set_entitlement(
        pool: &PgPool,
        id: DbId,
        plan: Plan,
        subscription_end: Option<Timestamp>,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                plan = $2,
                subscription_end_date = COALESCE($3, subscription_end_date),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(plan.as_str())
            .bind(subscription_end)
            .fetch_optional(pool)
            .await
    }

    /// Add `count` to the user's generation counter for the current period.
    pub async fn increment_generation_count(
        pool: &PgPool,
        id: DbId,
        count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET questions_generated_this_month = questions_generated_this_month + $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(count)
        .execute(pool)
        .await?;
        Ok(())
    }
}
