//! Handlers for notebooks, their permission lists and share links.
//!
//! Reads are allowed to anyone with an entry in the permission list, and a
//! notebook the caller cannot read is reported as missing. Mutations go
//! through [`permissions::require`], so a caller who is not the owner gets
//! 403 whether or not they hold a grant.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quizdeck_core::error::CoreError;
use quizdeck_core::permissions::{self, Access, Capability, PermissionLevel};
use quizdeck_core::types::DbId;
use quizdeck_db::models::notebook::{
    CreateNotebook, GrantPermission, Notebook, NotebookDetail, NotebookWithChapters,
    PermissionEntry, UpdateNotebook,
};
use quizdeck_db::models::share_link::CreateShareLink;
use quizdeck_db::repositories::{NotebookRepo, ShareLinkRepo, UserRepo};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Length of generated share tokens.
const SHARE_TOKEN_LEN: usize = 12;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkResponse {
    pub token: String,
    pub url: String,
    pub access_level: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemedShare {
    pub notebook_id: DbId,
    pub access_level: String,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Notebook",
        id,
    })
}

/// Load a notebook and the caller's access to it. Only a missing row is
/// reported as 404.
pub(crate) async fn resolve_notebook(
    state: &AppState,
    id: DbId,
    user_id: DbId,
) -> AppResult<(Notebook, Access)> {
    let notebook = NotebookRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let granted = NotebookRepo::find_permission(&state.pool, id, user_id).await?;
    let access = permissions::resolve_access(notebook.owner_id, user_id, granted);
    Ok((notebook, access))
}

/// Load a notebook the caller can read. A notebook without any access for
/// the caller is reported as 404.
pub(crate) async fn load_notebook(
    state: &AppState,
    id: DbId,
    user_id: DbId,
) -> AppResult<(Notebook, Access)> {
    let (notebook, access) = resolve_notebook(state, id, user_id).await?;
    if access == Access::None {
        return Err(not_found(id));
    }
    Ok((notebook, access))
}

/// POST /api/notebooks/new
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateNotebook>,
) -> AppResult<(StatusCode, Json<DataResponse<Notebook>>)> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Notebook title is required".into()));
    }

    let notebook = NotebookRepo::create(&state.pool, auth.user_id, title).await?;
    tracing::info!(notebook_id = notebook.id, user_id = auth.user_id, "Notebook created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: notebook })))
}

/// GET /api/notebooks
///
/// Notebooks the caller owns or was granted, each with chapter summaries.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<NotebookWithChapters>>>> {
    let notebooks = NotebookRepo::list_accessible(&state.pool, auth.user_id).await?;
    let ids: Vec<DbId> = notebooks.iter().map(|n| n.id).collect();

    let mut chapters_by_notebook: HashMap<DbId, Vec<_>> = HashMap::new();
    for summary in NotebookRepo::chapter_summaries(&state.pool, &ids).await? {
        chapters_by_notebook
            .entry(summary.notebook_id)
            .or_default()
            .push(summary);
    }

    let data = notebooks
        .into_iter()
        .map(|notebook| NotebookWithChapters {
            chapters: chapters_by_notebook.remove(&notebook.id).unwrap_or_default(),
            notebook,
        })
        .collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/notebooks/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<NotebookDetail>>> {
    let (notebook, _) = load_notebook(&state, id, auth.user_id).await?;
    let permissions = NotebookRepo::permissions(&state.pool, id).await?;
    let chapters = NotebookRepo::chapter_summaries(&state.pool, &[id]).await?;
    Ok(Json(DataResponse {
        data: NotebookDetail {
            notebook,
            permissions,
            chapters,
        },
    }))
}

/// PUT /api/notebooks/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateNotebook>,
) -> AppResult<Json<DataResponse<Notebook>>> {
    let (_, access) = resolve_notebook(&state, id, auth.user_id).await?;
    permissions::require(access, Capability::Update, "notebook")?;

    if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Notebook title must not be empty".into()));
    }

    let notebook = NotebookRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(notebook_id = id, user_id = auth.user_id, "Notebook updated");
    Ok(Json(DataResponse { data: notebook }))
}

/// DELETE /api/notebooks/{id}
///
/// Chapters, questions and share links go with it.
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (_, access) = resolve_notebook(&state, id, auth.user_id).await?;
    permissions::require(access, Capability::Delete, "notebook")?;

    if !NotebookRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(notebook_id = id, user_id = auth.user_id, "Notebook deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// PUT /api/notebooks/{id}/permissions
///
/// Grant a level to a user or change their level. Existing chapters keep
/// the permission snapshot taken when they were created.
pub async fn grant_permission(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<GrantPermission>,
) -> AppResult<Json<DataResponse<PermissionEntry>>> {
    let (notebook, access) = resolve_notebook(&state, id, auth.user_id).await?;
    permissions::require(access, Capability::Share, "notebook")?;

    if input.user_id == notebook.owner_id {
        return Err(AppError::BadRequest(
            "The owner's permission cannot be changed".into(),
        ));
    }
    UserRepo::find_by_id(&state.pool, input.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: input.user_id,
        }))?;

    let entry = NotebookRepo::grant(&state.pool, id, input.user_id, input.level).await?;
    tracing::info!(
        notebook_id = id,
        grantee = input.user_id,
        level = %input.level,
        "Notebook permission granted"
    );
    Ok(Json(DataResponse { data: entry }))
}

/// DELETE /api/notebooks/{id}/permissions/{user_id}
pub async fn revoke_permission(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let (notebook, access) = resolve_notebook(&state, id, auth.user_id).await?;
    permissions::require(access, Capability::Share, "notebook")?;

    if user_id == notebook.owner_id {
        return Err(AppError::BadRequest(
            "The owner's permission cannot be revoked".into(),
        ));
    }
    if !NotebookRepo::revoke(&state.pool, id, user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Permission",
            id: user_id,
        }));
    }
    tracing::info!(notebook_id = id, grantee = user_id, "Notebook permission revoked");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Share links
// ---------------------------------------------------------------------------

/// POST /api/notebooks/{id}/share-links
pub async fn create_share_link(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateShareLink>,
) -> AppResult<(StatusCode, Json<DataResponse<ShareLinkResponse>>)> {
    let (_, access) = resolve_notebook(&state, id, auth.user_id).await?;
    permissions::require(access, Capability::Share, "notebook")?;

    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(SHARE_TOKEN_LEN);

    let link = ShareLinkRepo::create(&state.pool, &token, id, input.access_level, auth.user_id)
        .await?;
    tracing::info!(notebook_id = id, user_id = auth.user_id, "Share link created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ShareLinkResponse {
                url: format!("{}/share/{}", state.config.frontend_url, link.token),
                token: link.token,
                access_level: link.access_level,
            },
        }),
    ))
}

/// POST /api/share/{token}
///
/// Gives the caller the link's level on its notebook. An existing entry is
/// left as it is, and the owner is unaffected.
pub async fn redeem_share_link(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<RedeemedShare>>> {
    let link = ShareLinkRepo::find_by_token(&state.pool, &token)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundByKey {
                entity: "Share link",
                key: token.clone(),
            })
        })?;
    let notebook = NotebookRepo::find_by_id(&state.pool, link.notebook_id)
        .await?
        .ok_or_else(|| not_found(link.notebook_id))?;

    let granted = NotebookRepo::find_permission(&state.pool, notebook.id, auth.user_id).await?;
    let access_level = match permissions::resolve_access(notebook.owner_id, auth.user_id, granted) {
        Access::Owner => PermissionLevel::Admin.as_str().to_string(),
        Access::Granted(level) => level.as_str().to_string(),
        Access::None => {
            let level: PermissionLevel = link
                .access_level
                .parse()
                .unwrap_or(PermissionLevel::ViewOnly);
            NotebookRepo::grant(&state.pool, notebook.id, auth.user_id, level).await?;
            tracing::info!(
                notebook_id = notebook.id,
                user_id = auth.user_id,
                level = %level,
                "Share link redeemed"
            );
            level.as_str().to_string()
        }
    };

    Ok(Json(DataResponse {
        data: RedeemedShare {
            notebook_id: notebook.id,
            access_level,
        },
    }))
}
