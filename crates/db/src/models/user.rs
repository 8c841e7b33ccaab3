//! User entity model and DTOs.

use quizdeck_core::plan::Plan;
use quizdeck_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub google_id: Option<String>,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub plan: String,
    pub subscription_end_date: Option<Timestamp>,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    pub questions_generated_this_month: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The stored plan, treating anything unrecognised as free.
    pub fn plan(&self) -> Plan {
        self.plan.parse().unwrap_or(Plan::Free)
    }
}

/// The subset of a user returned by session and token endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

/// Profile asserted by the external identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalProfile {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

/// DTO for creating a user outside the OAuth flow (payment-customer linkage).
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}
