//! Extractor for the authenticated user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use quizdeck_core::error::CoreError;
use quizdeck_core::types::DbId;

use crate::error::AppError;

/// The caller's identity, attached to the request by
/// [`require_session`](super::session::require_session).
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    pub email: Option<String>,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Not authenticated".into())))
    }
}
