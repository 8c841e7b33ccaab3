//! Route definitions for the `/notebooks` resource.
//!
//! Also nests chapter routes under `/notebooks/{notebook_id}/chapters`.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{chapter, notebook};
use crate::state::AppState;

/// Routes mounted at `/notebooks`.
///
/// ```text
/// GET    /                                  -> list
/// POST   /new                               -> create
/// GET    /{id}                              -> get_by_id
/// PUT    /{id}                              -> update
/// DELETE /{id}                              -> delete
/// PUT    /{id}/permissions                  -> grant_permission
/// DELETE /{id}/permissions/{user_id}        -> revoke_permission
/// POST   /{id}/share-links                  -> create_share_link
///
/// POST   /{notebook_id}/chapters/new        -> chapter::create
/// GET    /{notebook_id}/chapters/{id}       -> chapter::get_by_id
/// PUT    /{notebook_id}/chapters/{id}       -> chapter::update
/// DELETE /{notebook_id}/chapters/{id}       -> chapter::delete
/// ```
pub fn router() -> Router<AppState> {
    let chapter_routes = Router::new()
        .route("/new", post(chapter::create))
        .route(
            "/{id}",
            get(chapter::get_by_id)
                .put(chapter::update)
                .delete(chapter::delete),
        );

    Router::new()
        .route("/", get(notebook::list))
        .route("/new", post(notebook::create))
        .route(
            "/{id}",
            get(notebook::get_by_id)
                .put(notebook::update)
                .delete(notebook::delete),
        )
        .route("/{id}/permissions", put(notebook::grant_permission))
        .route(
            "/{id}/permissions/{user_id}",
            delete(notebook::revoke_permission),
        )
        .route("/{id}/share-links", post(notebook::create_share_link))
        .nest("/{notebook_id}/chapters", chapter_routes)
}

/// ```text
/// POST /share/{token}  -> redeem_share_link
/// ```
pub fn share_router() -> Router<AppState> {
    Router::new().route("/share/{token}", post(notebook::redeem_share_link))
}
