//! External identity providers and linking their profiles to local users.

use async_trait::async_trait;
use quizdeck_db::models::user::{ExternalProfile, User};
use quizdeck_db::repositories::UserRepo;
use sqlx::PgPool;

/// Errors from the OAuth code exchange.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Identity provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Identity provider returned an incomplete profile: {0}")]
    IncompleteProfile(&'static str),
}

/// Errors from [`link_identity`].
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The profile's email belongs to a user linked to another external id.
    #[error("Email is already linked to a different Google account")]
    AccountConflict,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// An OAuth 2.0 authorization-code provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent-screen URL the browser is redirected to.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's profile.
    async fn exchange_code(&self, code: &str) -> Result<ExternalProfile, OAuthError>;
}

/// Resolve the local user for an external profile.
///
/// 1. A user already linked to the external id is returned as is.
/// 2. Otherwise a user with the same email gets the external id attached.
/// 3. Otherwise a new user is inserted. The insert is keyed on the external
///    id, so two concurrent first logins end up with one row.
///
/// An email already held by a user with a different external id is
/// [`LinkError::AccountConflict`], including when a concurrent insert wins
/// the `uq_users_email` race.
pub async fn link_identity(pool: &PgPool, profile: &ExternalProfile) -> Result<User, LinkError> {
    if let Some(user) = UserRepo::find_by_google_id(pool, &profile.external_id).await? {
        return Ok(user);
    }

    if let Some(existing) = UserRepo::find_by_email(pool, &profile.email).await? {
        if existing.google_id.is_none() {
            if let Some(linked) = UserRepo::link_google_id(pool, existing.id, profile).await? {
                tracing::info!(user_id = linked.id, "Linked Google identity to existing user");
                return Ok(linked);
            }
        } else if existing.google_id.as_deref() != Some(profile.external_id.as_str()) {
            tracing::warn!(user_id = existing.id, "Email already linked to another Google account");
            return Err(LinkError::AccountConflict);
        }
    }

    let user = UserRepo::upsert_by_google_id(pool, profile)
        .await
        .map_err(|e| {
            let email_taken = matches!(
                &e,
                sqlx::Error::Database(db) if db.constraint() == Some("uq_users_email")
            );
            if email_taken {
                LinkError::AccountConflict
            } else {
                LinkError::Database(e)
            }
        })?;
    tracing::info!(user_id = user.id, "Created user from Google profile");
    Ok(user)
}
