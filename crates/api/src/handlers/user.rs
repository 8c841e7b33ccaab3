//! Handlers for the caller's profile, payment-customer linkage and
//! incorrect-answer log.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use quizdeck_core::error::CoreError;
use quizdeck_db::models::incorrect_answer::{CreateIncorrectAnswer, IncorrectAnswer};
use quizdeck_db::models::user::User;
use quizdeck_db::repositories::{IncorrectAnswerRepo, UserRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCustomer {
    #[serde(default)]
    pub customer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn missing_user(auth: &AuthUser) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "User",
        id: auth.user_id,
    })
}

/// GET /api/user/me
pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| missing_user(&auth))?;
    Ok(Json(DataResponse { data: user }))
}

/// PUT /api/user/stripe-customer
///
/// Record the payment-provider customer reference so later billing events
/// resolve to this user. A reference already held by another user is a
/// conflict.
pub async fn link_stripe_customer(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LinkCustomer>,
) -> AppResult<Json<DataResponse<User>>> {
    let customer_id = input.customer_id.trim();
    if customer_id.is_empty() {
        return Err(AppError::BadRequest("customerId is required".into()));
    }

    if let Some(holder) = UserRepo::find_by_stripe_customer(&state.pool, customer_id).await? {
        if holder.id != auth.user_id {
            return Err(AppError::Core(CoreError::Conflict(
                "Customer reference is linked to another user".into(),
            )));
        }
    }

    let user = UserRepo::set_stripe_customer(&state.pool, auth.user_id, customer_id)
        .await?
        .ok_or_else(|| missing_user(&auth))?;
    tracing::info!(user_id = auth.user_id, "Payment customer linked");
    Ok(Json(DataResponse { data: user }))
}

/// POST /api/incorrect-answers
pub async fn log_incorrect_answer(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateIncorrectAnswer>,
) -> AppResult<(StatusCode, Json<DataResponse<IncorrectAnswer>>)> {
    let mcq_id = input.mcq_id.trim();
    if mcq_id.is_empty() {
        return Err(AppError::BadRequest("mcqId is required".into()));
    }

    let entry =
        IncorrectAnswerRepo::create(&state.pool, auth.user_id, mcq_id, &input.factoid).await?;
    tracing::debug!(user_id = auth.user_id, question_ref = mcq_id, "Incorrect answer logged");
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// GET /api/incorrect-answers
pub async fn list_incorrect_answers(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<IncorrectAnswer>>>> {
    let entries =
        IncorrectAnswerRepo::list_for_user(&state.pool, auth.user_id, params.limit, params.offset)
            .await?;
    Ok(Json(DataResponse { data: entries }))
}
