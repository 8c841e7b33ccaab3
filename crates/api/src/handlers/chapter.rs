//! Handlers for chapters, their questions and their generation jobs.
//!
//! A chapter is read through its notebook: the caller must own the
//! notebook or appear in the chapter's permission snapshot. Updates and
//! deletes by anyone but the owner are 403. Creating a chapter records a generation job and sends it to
//! the generation service in the background.

use std::collections::HashMap;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use quizdeck_core::error::CoreError;
use quizdeck_core::generation::{
    DEFAULT_CHAPTER_QUESTION_COUNT, JOB_KIND_CHAPTER, JOB_STATUS_FULFILLED, JOB_STATUS_SUBMITTED,
    MAX_CHAPTER_QUESTION_COUNT,
};
use quizdeck_core::permissions::{self, Access, Capability};
use quizdeck_core::types::DbId;
use quizdeck_db::models::chapter::{Chapter, ChapterDetail, CreateChapter, UpdateChapter};
use quizdeck_db::models::generation_job::GenerationJob;
use quizdeck_db::models::notebook::Notebook;
use quizdeck_db::models::question::QuestionWithResponse;
use quizdeck_db::repositories::{
    ChapterRepo, GenerationJobRepo, NotebookRepo, QuestionRepo, UserRepo, UserResponseRepo,
};
use quizdeck_generation::types::ChapterGenerationRequest;
use serde::Serialize;

use crate::dispatch;
use crate::error::{AppError, AppResult};
use crate::handlers::notebook::resolve_notebook;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_QUESTION_STYLE: &str = "standard";

/// Multipart parts that carry media. They are read and discarded.
const MEDIA_FIELDS: [&str; 3] = ["pdfs", "videos", "audios"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterQuestions {
    pub chapter_title: String,
    pub questions_with_responses: Vec<QuestionWithResponse>,
}

fn chapter_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Chapter",
        id,
    })
}

/// Resolve the caller's access to a chapter of `notebook`.
///
/// Grants come from the snapshot taken when the chapter was created, so
/// later changes to the notebook's list do not reach existing chapters.
pub(crate) async fn chapter_access(
    state: &AppState,
    notebook: &Notebook,
    chapter_id: DbId,
    user_id: DbId,
) -> AppResult<Access> {
    let granted = ChapterRepo::find_permission(&state.pool, chapter_id, user_id).await?;
    Ok(permissions::resolve_access(notebook.owner_id, user_id, granted))
}

/// Load a chapter that must belong to `notebook_id`, with the caller's
/// access. Only missing rows (or a chapter of another notebook) are 404.
async fn resolve_chapter(
    state: &AppState,
    notebook_id: DbId,
    chapter_id: DbId,
    user_id: DbId,
) -> AppResult<(Notebook, Chapter, Access)> {
    let notebook = NotebookRepo::find_by_id(&state.pool, notebook_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Notebook",
            id: notebook_id,
        }))?;
    let chapter = ChapterRepo::find_in_notebook(&state.pool, notebook_id, chapter_id)
        .await?
        .ok_or_else(|| chapter_not_found(chapter_id))?;

    let access = chapter_access(state, &notebook, chapter_id, user_id).await?;
    Ok((notebook, chapter, access))
}

/// Like [`resolve_chapter`], but a chapter the caller has no access to is
/// reported as 404.
async fn load_chapter(
    state: &AppState,
    notebook_id: DbId,
    chapter_id: DbId,
    user_id: DbId,
) -> AppResult<(Notebook, Chapter, Access)> {
    let (notebook, chapter, access) =
        resolve_chapter(state, notebook_id, chapter_id, user_id).await?;
    if access == Access::None {
        return Err(chapter_not_found(chapter_id));
    }
    Ok((notebook, chapter, access))
}

/// Checkbox-style form values.
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1" | "yes")
}

/// Parse the requested question count, clamped to the allowed range.
fn parse_question_count(value: Option<&str>) -> AppResult<i32> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_CHAPTER_QUESTION_COUNT);
    };
    let count: i32 = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid num_questions '{raw}'")))?;
    Ok(count.clamp(1, MAX_CHAPTER_QUESTION_COUNT))
}

/// Collect the text parts of a chapter upload.
async fn read_chapter_form(multipart: &mut Multipart) -> AppResult<CreateChapter> {
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if MEDIA_FIELDS.contains(&name.as_str()) || field.file_name().is_some() {
            let discarded = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            tracing::debug!(field = %name, bytes = discarded.len(), "Discarded media part");
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        fields.insert(name, value);
    }

    let title = fields
        .get("title")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Chapter title is required".into()))?;
    let content = fields
        .remove("text")
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Chapter text is required".into()))?;
    let question_style = fields
        .get("question_style")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_QUESTION_STYLE.to_string());
    let num_questions = parse_question_count(fields.get("num_questions").map(String::as_str))?;
    let strategic_mode = fields.get("use_bolding").is_some_and(|v| parse_flag(v));
    let intro_questions = fields.get("intro_questions").is_some_and(|v| parse_flag(v));
    let statements = fields
        .remove("Statements of information")
        .filter(|s| !s.trim().is_empty());

    Ok(CreateChapter {
        title,
        content,
        question_style,
        num_questions,
        strategic_mode,
        intro_questions,
        statements,
    })
}

fn generation_request(chapter: &Chapter) -> ChapterGenerationRequest {
    ChapterGenerationRequest {
        chapter_id: chapter.id.to_string(),
        job_id: None,
        text: chapter.content.clone(),
        num_questions: chapter.num_questions,
        question_style: chapter.question_style.to_lowercase(),
        use_bolding: chapter.strategic_mode,
        intro_questions: chapter.intro_questions,
        statements: chapter.statements.clone(),
    }
}

/// POST /api/notebooks/{id}/chapters/new
///
/// Multipart upload. Stores the chapter, records a generation job for it
/// and sends the job without waiting for the service.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notebook_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Chapter>>)> {
    let (_, access) = resolve_notebook(&state, notebook_id, auth.user_id).await?;
    permissions::require(access, Capability::AddChapter, "notebook")?;

    let input = read_chapter_form(&mut multipart).await?;
    let chapter = ChapterRepo::create(&state.pool, notebook_id, &input).await?;
    tracing::info!(
        chapter_id = chapter.id,
        notebook_id,
        user_id = auth.user_id,
        "Chapter created"
    );

    let policy = state.config.generation.policy;
    let job = dispatch::record_job(
        &state.pool,
        JOB_KIND_CHAPTER,
        chapter.id,
        auth.user_id,
        None,
        &generation_request(&chapter),
        &policy,
    )
    .await?;
    UserRepo::increment_generation_count(&state.pool, auth.user_id, chapter.num_questions).await?;
    dispatch::spawn_send(state.pool.clone(), state.generation.clone(), job);

    Ok((StatusCode::CREATED, Json(DataResponse { data: chapter })))
}

/// GET /api/notebooks/{notebook_id}/chapters/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((notebook_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ChapterDetail>>> {
    let (_, chapter, _) = load_chapter(&state, notebook_id, id, auth.user_id).await?;
    let permissions = ChapterRepo::permissions(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ChapterDetail {
            chapter,
            permissions,
        },
    }))
}

/// PUT /api/notebooks/{notebook_id}/chapters/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((notebook_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateChapter>,
) -> AppResult<Json<DataResponse<Chapter>>> {
    let (_, _, access) = resolve_chapter(&state, notebook_id, id, auth.user_id).await?;
    permissions::require(access, Capability::Update, "chapter")?;

    if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Chapter title must not be empty".into()));
    }

    let chapter = ChapterRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| chapter_not_found(id))?;
    tracing::info!(chapter_id = id, user_id = auth.user_id, "Chapter updated");
    Ok(Json(DataResponse { data: chapter }))
}

/// DELETE /api/notebooks/{notebook_id}/chapters/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((notebook_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let (_, _, access) = resolve_chapter(&state, notebook_id, id, auth.user_id).await?;
    permissions::require(access, Capability::Delete, "chapter")?;

    if !ChapterRepo::delete(&state.pool, id).await? {
        return Err(chapter_not_found(id));
    }
    tracing::info!(chapter_id = id, user_id = auth.user_id, "Chapter deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Load a chapter by id alone, checking the caller can read it.
async fn load_readable_chapter(
    state: &AppState,
    id: DbId,
    user_id: DbId,
) -> AppResult<(Notebook, Chapter)> {
    let chapter = ChapterRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| chapter_not_found(id))?;
    let (notebook, _, _) = load_chapter(state, chapter.notebook_id, id, user_id).await?;
    Ok((notebook, chapter))
}

/// GET /api/chapter/{id}/questions
///
/// General questions plus those generated for the caller, each with the
/// caller's latest answer.
pub async fn list_questions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ChapterQuestions>> {
    let (_, chapter) = load_readable_chapter(&state, id, auth.user_id).await?;

    let questions = QuestionRepo::list_visible(&state.pool, id, auth.user_id).await?;
    let mut responses: HashMap<DbId, _> =
        UserResponseRepo::list_for_chapter(&state.pool, auth.user_id, id)
            .await?
            .into_iter()
            .map(|r| (r.question_id, r))
            .collect();

    let questions_with_responses = questions
        .into_iter()
        .map(|question| {
            let response = responses.remove(&question.id);
            QuestionWithResponse {
                flagged: response.as_ref().is_some_and(|r| r.flagged),
                user_response: response.map(|r| r.selected_answer),
                question,
            }
        })
        .collect();

    Ok(Json(ChapterQuestions {
        chapter_title: chapter.title,
        questions_with_responses,
    }))
}

/// GET /api/chapters/{id}/generation-jobs
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<GenerationJob>>>> {
    load_readable_chapter(&state, id, auth.user_id).await?;
    let jobs = GenerationJobRepo::list_for_chapter(&state.pool, id).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// POST /api/generation-jobs/{id}/retry
///
/// Resubmit a timed-out or failed job. Only the notebook owner may retry,
/// and the attempt cap applied by the sweep does not apply here. The send
/// happens inline so the caller learns whether the service accepted it.
pub async fn retry_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GenerationJob>>> {
    let job_not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Generation job",
            id,
        })
    };
    let job = GenerationJobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(job_not_found)?;
    let (notebook, _) = load_readable_chapter(&state, job.chapter_id, auth.user_id)
        .await
        .map_err(|_| job_not_found())?;
    if notebook.owner_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the notebook owner can retry generation jobs".into(),
        )));
    }

    match job.status.as_str() {
        JOB_STATUS_FULFILLED => {
            return Err(AppError::Core(CoreError::Conflict(
                "Generation job is already fulfilled".into(),
            )))
        }
        JOB_STATUS_SUBMITTED => {
            return Err(AppError::Core(CoreError::Conflict(
                "Generation job is still awaiting its result".into(),
            )))
        }
        _ => {}
    }

    let deadline = dispatch::deadline_from(Utc::now(), &state.config.generation.policy);
    let job = GenerationJobRepo::resubmit(&state.pool, id, deadline)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Generation job changed state, try again".into(),
            ))
        })?;
    tracing::info!(job_id = id, attempts = job.attempts, "Generation job resubmitted");

    if let Err(e) = dispatch::send(state.generation.as_ref(), &job).await {
        GenerationJobRepo::mark_failed(&state.pool, id, &e.to_string()).await?;
        return Err(AppError::Upstream(format!("Generation service rejected the job: {e}")));
    }
    Ok(Json(DataResponse { data: job }))
}
