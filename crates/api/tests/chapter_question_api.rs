//! Integration tests for chapters, generation callbacks, answers and job
//! retries.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use common::{
    body_json, create_chapter, create_notebook, delete_auth, generated_question, get_auth,
    multipart_body, post_json, post_json_auth, post_multipart_auth, put_json_auth, send,
    wait_until,
};
use serde_json::json;
use sqlx::PgPool;

async fn job_ids(pool: &PgPool, chapter_id: i64, kind: &str) -> Vec<i64> {
    sqlx::query_scalar("SELECT id FROM generation_jobs WHERE chapter_id = $1 AND kind = $2 ORDER BY id")
        .bind(chapter_id)
        .bind(kind)
        .fetch_all(pool)
        .await
        .unwrap()
}

async fn job_status(pool: &PgPool, job_id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM generation_jobs WHERE id = $1")
        .bind(job_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Poll until the job reaches `status`. Sends happen on spawned tasks.
async fn wait_for_status(pool: &PgPool, job_id: i64, status: &str) -> bool {
    for _ in 0..200 {
        if job_status(pool, job_id).await == status {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn generation_count(pool: &PgPool, user_id: i64) -> i32 {
    sqlx::query_scalar("SELECT questions_generated_this_month FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn post_auth(app: axum::Router, uri: &str, token: &str) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Deliver generated questions for a chapter.
async fn deliver_questions(app: &common::TestApp, chapter_id: i64) -> serde_json::Value {
    let response = post_json(
        app.app(),
        "/api/generatedresponse",
        json!({
            "ID": chapter_id.to_string(),
            "questions": [
                generated_question("What produces ATP?", "Mitochondria", "Ribosome"),
                generated_question("Where is DNA stored?", "Nucleus", "Golgi"),
            ]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn question_ids(app: &common::TestApp, token: &str, chapter_id: i64) -> Vec<i64> {
    let response = get_auth(app.app(), &format!("/api/chapter/{chapter_id}/questions"), token).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["questionsWithResponses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["question"]["id"].as_i64().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Chapter upload
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn chapter_upload_records_and_sends_generation_job(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;

    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;

    let gateway = app.gateway.clone();
    assert!(wait_until(|| gateway.chapter_requests().len() == 1).await);
    let request = &app.gateway.chapter_requests()[0];
    let jobs = job_ids(&pool, chapter_id, "chapter").await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(request.chapter_id, chapter_id.to_string());
    assert_eq!(request.job_id, Some(jobs[0]));
    assert_eq!(request.num_questions, 3);
    assert_eq!(request.question_style, "clinical");
    assert!(request.use_bolding);
    assert!(!request.intro_questions);

    assert_eq!(generation_count(&pool, user.id).await, 3);

    let response = get_auth(
        app.app(),
        &format!("/api/chapters/{chapter_id}/generation-jobs"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["kind"], "chapter");
    assert_eq!(json["data"][0]["status"], "submitted");
    assert_eq!(json["data"][0]["attempts"], 1);
    assert!(json["data"][0].get("payload").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn chapter_upload_validates_form(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let uri = format!("/api/notebooks/{notebook_id}/chapters/new");

    let missing_title = multipart_body(&[("text", "Some text")], &[]);
    let response = post_multipart_auth(app.app(), &uri, &token, missing_title).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Chapter title is required");

    let missing_text = multipart_body(&[("title", "Cells")], &[]);
    let response = post_multipart_auth(app.app(), &uri, &token, missing_text).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Chapter text is required");

    let bad_count = multipart_body(
        &[("title", "Cells"), ("text", "Some text"), ("num_questions", "many")],
        &[],
    );
    let response = post_multipart_auth(app.app(), &uri, &token, bad_count).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn chapter_upload_applies_defaults_and_discards_media(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;

    let body = multipart_body(
        &[
            ("title", "Cells"),
            ("text", "Some text"),
            ("num_questions", "500"),
            ("Statements of information", "Cells divide."),
        ],
        &[("pdfs", "notes.pdf", b"%PDF-1.4 fake")],
    );
    let response = post_multipart_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/chapters/new"),
        &token,
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["numQuestions"], 100);
    assert_eq!(json["data"]["questionStyle"], "standard");
    assert_eq!(json["data"]["strategicMode"], false);
    assert_eq!(json["data"]["statements"], "Cells divide.");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn only_owner_adds_chapters(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, owner) = app.user("owner@x.com").await;
    let (reader, reader_token) = app.user("reader@x.com").await;
    let (_, stranger) = app.user("stranger@x.com").await;
    let notebook_id = create_notebook(&app, &owner, "Biology").await;
    put_json_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/permissions"),
        &owner,
        json!({ "userId": reader.id, "level": "editor" }),
    )
    .await;
    let uri = format!("/api/notebooks/{notebook_id}/chapters/new");
    let body = || multipart_body(&[("title", "Cells"), ("text", "Some text")], &[]);

    let response = post_multipart_auth(app.app(), &uri, &reader_token, body()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_multipart_auth(app.app(), &uri, &stranger, body()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn chapter_get_update_delete(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (owner_user, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let other_notebook = create_notebook(&app, &token, "Chemistry").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    let uri = format!("/api/notebooks/{notebook_id}/chapters/{chapter_id}");

    let response = get_auth(app.app(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["title"], "Cells");
    assert_eq!(json["data"]["permissions"][0]["userId"], owner_user.id);

    let response = get_auth(
        app.app(),
        &format!("/api/notebooks/{other_notebook}/chapters/{chapter_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = put_json_auth(app.app(), &uri, &token, json!({ "title": "" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(app.app(), &uri, &token, json!({ "title": "Cell Biology" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["title"], "Cell Biology");

    let response = delete_auth(app.app(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app.app(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn grantee_reads_chapter_but_cannot_delete(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, owner) = app.user("owner@x.com").await;
    let (reader, reader_token) = app.user("reader@x.com").await;
    let notebook_id = create_notebook(&app, &owner, "Biology").await;
    put_json_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/permissions"),
        &owner,
        json!({ "userId": reader.id, "level": "view-only" }),
    )
    .await;
    let chapter_id = create_chapter(&app, &owner, notebook_id, "Cells").await;
    let uri = format!("/api/notebooks/{notebook_id}/chapters/{chapter_id}");

    let response = get_auth(app.app(), &uri, &reader_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = delete_auth(app.app(), &uri, &reader_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stranger_cannot_modify_chapter(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, owner) = app.user("owner@x.com").await;
    let (_, stranger) = app.user("stranger@x.com").await;
    let notebook_id = create_notebook(&app, &owner, "Biology").await;
    let chapter_id = create_chapter(&app, &owner, notebook_id, "Cells").await;
    let uri = format!("/api/notebooks/{notebook_id}/chapters/{chapter_id}");

    let response = put_json_auth(app.app(), &uri, &stranger, json!({ "title": "Hijacked" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(app.app(), &uri, &stranger).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app.app(), &uri, &owner).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["title"], "Cells");

    let response = get_auth(app.app(), &uri, &stranger).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn later_grants_do_not_reach_existing_chapters(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (owner_user, owner) = app.user("owner@x.com").await;
    let (reader, reader_token) = app.user("reader@x.com").await;
    let notebook_id = create_notebook(&app, &owner, "Biology").await;
    let earlier = create_chapter(&app, &owner, notebook_id, "Cells").await;

    let response = put_json_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/permissions"),
        &owner,
        json!({ "userId": reader.id, "level": "editor" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let later = create_chapter(&app, &owner, notebook_id, "Tissues").await;

    let snapshot: Vec<i64> = sqlx::query_scalar(
        "SELECT user_id FROM chapter_permissions WHERE chapter_id = $1 ORDER BY user_id",
    )
    .bind(earlier)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(snapshot, vec![owner_user.id]);

    let response = get_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/chapters/{earlier}"),
        &reader_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/chapters/{later}"),
        &reader_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["permissions"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Generation callbacks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn generated_questions_are_stored_and_fulfil_the_job(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    let jobs = job_ids(&pool, chapter_id, "chapter").await;

    let json = deliver_questions(&app, chapter_id).await;

    assert_eq!(json["data"]["chapterId"], chapter_id);
    assert_eq!(json["data"]["questionsAdded"], 2);
    assert_eq!(json["data"]["jobId"], jobs[0]);
    assert_eq!(job_status(&pool, jobs[0]).await, "fulfilled");

    let response = get_auth(app.app(), &format!("/api/chapter/{chapter_id}/questions"), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["chapterTitle"], "Cells");
    let questions = json["questionsWithResponses"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["question"]["question"], "What produces ATP?");
    assert!(questions[0]["userResponse"].is_null());
    assert_eq!(questions[0]["flagged"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn generated_callback_with_explicit_job_id(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    let job_id = job_ids(&pool, chapter_id, "chapter").await[0];

    let response = post_json(
        app.app(),
        "/api/generatedresponse",
        json!({
            "ID": chapter_id,
            "job_ID": job_id.to_string(),
            "questions": [generated_question("Q?", "A", "B")]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["jobId"], job_id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn generated_callback_validation(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;

    let response = post_json(
        app.app(),
        "/api/generatedresponse",
        json!({ "questions": [generated_question("Q?", "A", "B")] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.app(),
        "/api/generatedresponse",
        json!({ "ID": chapter_id, "questions": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.app(),
        "/api/generatedresponse",
        json!({ "ID": chapter_id, "questions": [{ "question": "Q?", "answerChoices": [] }] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.app(),
        "/api/generatedresponse",
        json!({
            "ID": chapter_id,
            "questions": [{
                "question": "Q?",
                "answerChoices": [{ "value": "A", "correct": false }]
            }]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Question 0: Question must have a correct answer choice"
    );

    let response = post_json(
        app.app(),
        "/api/generatedresponse",
        json!({ "ID": 999_999, "questions": [generated_question("Q?", "A", "B")] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn callback_token_is_enforced_when_configured(pool: PgPool) {
    let mut config = common::test_config();
    config.generation.callback_token = Some("s3cret".to_string());
    let app = common::build_test_app_with(pool, config, None);
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    let body = json!({ "ID": chapter_id, "questions": [generated_question("Q?", "A", "B")] });

    let response = post_json(app.app(), "/api/generatedresponse", body.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/generatedresponse")
        .header(CONTENT_TYPE, "application/json")
        .header("x-callback-token", "s3cret")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = send(app.app(), request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Answers and follow-up questions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn correct_answer_is_recorded(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    deliver_questions(&app, chapter_id).await;
    let question_id = question_ids(&app, &token, chapter_id).await[0];

    let response = post_json_auth(
        app.app(),
        &format!("/api/questions/{question_id}/responses"),
        &token,
        json!({ "selectedAnswer": "Mitochondria", "flagged": true }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["correct"], true);
    assert!(json["data"]["followUpJobId"].is_null());
    assert_eq!(json["data"]["response"]["selectedAnswer"], "Mitochondria");
    assert!(job_ids(&pool, chapter_id, "similar").await.is_empty());
    assert_eq!(generation_count(&pool, user.id).await, 3);

    let response = get_auth(app.app(), &format!("/api/chapter/{chapter_id}/questions"), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["questionsWithResponses"][0]["userResponse"], "Mitochondria");
    assert_eq!(json["questionsWithResponses"][0]["flagged"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn answering_again_replaces_the_response(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    deliver_questions(&app, chapter_id).await;
    let question_id = question_ids(&app, &token, chapter_id).await[0];
    let uri = format!("/api/questions/{question_id}/responses");

    post_json_auth(app.app(), &uri, &token, json!({ "selectedAnswer": "Mitochondria" })).await;
    post_json_auth(app.app(), &uri, &token, json!({ "selectedAnswer": "Mitochondria" })).await;

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_responses WHERE user_id = $1 AND question_id = $2",
    )
    .bind(user.id)
    .bind(question_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn incorrect_answer_requests_a_similar_question(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    deliver_questions(&app, chapter_id).await;
    let question_id = question_ids(&app, &token, chapter_id).await[0];

    let response = post_json_auth(
        app.app(),
        &format!("/api/questions/{question_id}/responses"),
        &token,
        json!({ "selectedAnswer": "Ribosome" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["correct"], false);
    let job_id = json["data"]["followUpJobId"].as_i64().unwrap();

    let gateway = app.gateway.clone();
    assert!(wait_until(|| gateway.similar_requests().len() == 1).await);
    let request = &app.gateway.similar_requests()[0];
    assert_eq!(request.job_id, Some(job_id));
    assert_eq!(request.notebook_id, notebook_id.to_string());
    assert_eq!(request.chapter_id, chapter_id.to_string());
    assert_eq!(request.user_id, user.id.to_string());
    assert_eq!(request.question_id, question_id.to_string());
    assert_eq!(request.question, "What produces ATP?");
    assert_eq!(request.num_questions, 1);
    assert!(request.bold);

    assert_eq!(generation_count(&pool, user.id).await, 4);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn similar_questions_are_visible_only_to_their_reader(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (owner_user, owner) = app.user("owner@x.com").await;
    let (reader, reader_token) = app.user("reader@x.com").await;
    let notebook_id = create_notebook(&app, &owner, "Biology").await;
    put_json_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/permissions"),
        &owner,
        json!({ "userId": reader.id, "level": "view-only" }),
    )
    .await;
    let chapter_id = create_chapter(&app, &owner, notebook_id, "Cells").await;
    deliver_questions(&app, chapter_id).await;
    let question_id = question_ids(&app, &owner, chapter_id).await[0];
    let response = post_json_auth(
        app.app(),
        &format!("/api/questions/{question_id}/responses"),
        &owner,
        json!({ "selectedAnswer": "Ribosome" }),
    )
    .await;
    let job_id = body_json(response).await["data"]["followUpJobId"]
        .as_i64()
        .unwrap();

    let response = post_json(
        app.app(),
        "/api/similarresponse",
        json!({
            "notebook_ID": notebook_id.to_string(),
            "chapter_ID": chapter_id.to_string(),
            "question_ID": question_id.to_string(),
            "user_ID": owner_user.id.to_string(),
            "questions": [{
                "question": "Which organelle makes ATP?",
                "answerChoices": [
                    { "value": "Mitochondria", "correct": true },
                    { "value": "Lysosome", "correct": false }
                ]
            }]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["questionsAdded"], 1);
    assert_eq!(json["data"]["jobId"], job_id);
    assert_eq!(job_status(&pool, job_id).await, "fulfilled");

    let owner_view = get_auth(app.app(), &format!("/api/chapter/{chapter_id}/questions"), &owner).await;
    let owner_json = body_json(owner_view).await;
    let owner_questions = owner_json["questionsWithResponses"].as_array().unwrap();
    assert_eq!(owner_questions.len(), 3);
    let personal = &owner_questions[2]["question"];
    assert_eq!(personal["createdForUser"], owner_user.id);
    assert_eq!(personal["sourceQuestionId"], question_id);
    assert_eq!(personal["explanation"], "No explanation provided");

    assert_eq!(question_ids(&app, &reader_token, chapter_id).await.len(), 2);

    let personal_id = personal["id"].as_i64().unwrap();
    let response = post_json_auth(
        app.app(),
        &format!("/api/questions/{personal_id}/responses"),
        &reader_token,
        json!({ "selectedAnswer": "Mitochondria" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn similar_callback_checks_chapter_belongs_to_notebook(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let other_notebook = create_notebook(&app, &token, "Chemistry").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;

    let response = post_json(
        app.app(),
        "/api/similarresponse",
        json!({
            "notebook_ID": other_notebook,
            "chapter_ID": chapter_id,
            "question_ID": 1,
            "questions": [generated_question("Q?", "A", "B")]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json(
        app.app(),
        "/api/similarresponse",
        json!({
            "notebook_ID": notebook_id,
            "chapter_ID": chapter_id,
            "questions": [generated_question("Q?", "A", "B")]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "question_ID is required");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stranger_cannot_answer_or_list(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, owner) = app.user("owner@x.com").await;
    let (_, stranger) = app.user("stranger@x.com").await;
    let notebook_id = create_notebook(&app, &owner, "Biology").await;
    let chapter_id = create_chapter(&app, &owner, notebook_id, "Cells").await;
    deliver_questions(&app, chapter_id).await;
    let question_id = question_ids(&app, &owner, chapter_id).await[0];

    let response =
        get_auth(app.app(), &format!("/api/chapter/{chapter_id}/questions"), &stranger).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(
        app.app(),
        &format!("/api/questions/{question_id}/responses"),
        &stranger,
        json!({ "selectedAnswer": "Mitochondria" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Job retry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_job_can_be_retried_by_owner(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    app.gateway.set_failing(true);
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    let job_id = job_ids(&pool, chapter_id, "chapter").await[0];
    assert!(wait_for_status(&pool, job_id, "failed").await);

    app.gateway.set_failing(false);
    let response = post_auth(app.app(), &format!("/api/generation-jobs/{job_id}/retry"), &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "submitted");
    assert_eq!(json["data"]["attempts"], 2);
    let requests = app.gateway.chapter_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].job_id, Some(job_id));

    let response = post_auth(app.app(), &format!("/api/generation-jobs/{job_id}/retry"), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn retry_that_fails_again_reports_upstream_error(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    app.gateway.set_failing(true);
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    let job_id = job_ids(&pool, chapter_id, "chapter").await[0];
    assert!(wait_for_status(&pool, job_id, "failed").await);

    let response = post_auth(app.app(), &format!("/api/generation-jobs/{job_id}/retry"), &token).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "UPSTREAM_ERROR");
    assert_eq!(job_status(&pool, job_id).await, "failed");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn fulfilled_job_cannot_be_retried(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_, token) = app.user("owner@x.com").await;
    let notebook_id = create_notebook(&app, &token, "Biology").await;
    let chapter_id = create_chapter(&app, &token, notebook_id, "Cells").await;
    let job_id = job_ids(&pool, chapter_id, "chapter").await[0];
    deliver_questions(&app, chapter_id).await;

    let response = post_auth(app.app(), &format!("/api/generation-jobs/{job_id}/retry"), &token).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn retry_is_owner_only(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_, owner) = app.user("owner@x.com").await;
    let (reader, reader_token) = app.user("reader@x.com").await;
    let (_, stranger) = app.user("stranger@x.com").await;
    let notebook_id = create_notebook(&app, &owner, "Biology").await;
    put_json_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/permissions"),
        &owner,
        json!({ "userId": reader.id, "level": "admin" }),
    )
    .await;
    let chapter_id = create_chapter(&app, &owner, notebook_id, "Cells").await;
    let job_id = job_ids(&pool, chapter_id, "chapter").await[0];
    let uri = format!("/api/generation-jobs/{job_id}/retry");

    let response = post_auth(app.app(), &uri, &reader_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_auth(app.app(), &uri, &stranger).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_auth(app.app(), "/api/generation-jobs/999999/retry", &owner).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
