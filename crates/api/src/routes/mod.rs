pub mod auth;
pub mod callbacks;
pub mod chapter;
pub mod health;
pub mod note;
pub mod notebook;
pub mod question_bank;
pub mod user;

use axum::Router;

use crate::middleware::session::require_session;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/google                                     OAuth redirect (public)
/// /auth/google/callback                            OAuth callback (public)
/// /auth/_log                                       client log sink (public)
/// /auth/session                                    session check
/// /verify-token                                    token check (public)
/// /logout                                          clear cookie (public)
///
/// /generatedresponse                               generation callback (public)
/// /similarresponse                                 generation callback (public)
/// /webhook                                         payment events (public)
///
/// /notebooks                                       list
/// /notebooks/new                                   create
/// /notebooks/{id}                                  get, update, delete
/// /notebooks/{id}/permissions                      grant (PUT)
/// /notebooks/{id}/permissions/{user_id}            revoke (DELETE)
/// /notebooks/{id}/share-links                      create share link (POST)
/// /notebooks/{id}/chapters/new                     multipart upload (POST)
/// /notebooks/{notebook_id}/chapters/{id}           get, update, delete
/// /share/{token}                                   redeem share link (POST)
///
/// /chapter/{id}/questions                          questions with responses
/// /chapters/{id}/generation-jobs                   job history
/// /generation-jobs/{id}/retry                      resubmit job (POST)
/// /questions/{id}/responses                        submit answer (POST)
///
/// /questionbank                                    list
/// /questionbank/import                             import (POST)
/// /questionbank/save-progress                      save progress (POST)
/// /questionbank/{source_file}                      questions
/// /questionbank/{source_file}/progress             saved progress
///
/// /notes                                           list, create
/// /notes/{id}                                      get, update, delete
///
/// /user/me                                         profile
/// /user/stripe-customer                            link customer (PUT)
/// /incorrect-answers                               list, log
/// ```
///
/// Everything not marked public sits behind [`require_session`].
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(auth::session_router())
        .nest("/notebooks", notebook::router())
        .merge(notebook::share_router())
        .merge(chapter::router())
        .nest("/questionbank", question_bank::router())
        .nest("/notes", note::router())
        .merge(user::router())
        .route_layer(axum::middleware::from_fn_with_state(state, require_session));

    Router::new()
        .merge(auth::public_router())
        .merge(callbacks::router())
        .merge(protected)
}
