#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use quizdeck_api::auth::identity::{IdentityProvider, OAuthError};
use quizdeck_api::auth::jwt::{self, JwtConfig};
use quizdeck_api::billing::StripeConfig;
use quizdeck_api::config::{GenerationConfig, ServerConfig};
use quizdeck_api::router::build_app_router;
use quizdeck_api::state::AppState;
use quizdeck_core::generation::RetryPolicy;
use quizdeck_db::models::user::{CreateUser, ExternalProfile, User};
use quizdeck_db::repositories::UserRepo;
use quizdeck_generation::types::{ChapterGenerationRequest, SimilarQuestionRequest};
use quizdeck_generation::{GenerationApiError, GenerationGateway};
use quizdeck_notify::{EmailError, Mailer};

pub const FRONTEND_URL: &str = "http://localhost:3000";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const MULTIPART_BOUNDARY: &str = "quizdeck-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
///
/// Webhooks are verified with [`WEBHOOK_SECRET`] and callbacks need no
/// token.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        frontend_url: FRONTEND_URL.to_string(),
        cors_origins: vec![FRONTEND_URL.to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_upload_bytes: 10 * 1024 * 1024,
        cookie_secure: false,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            ttl_hours: 24,
            refresh_threshold_hours: 6,
        },
        google: None,
        stripe: StripeConfig {
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            signature_tolerance_secs: 300,
        },
        generation: GenerationConfig {
            api_url: "http://generation.test".to_string(),
            callback_token: None,
            policy: RetryPolicy::default(),
            sweep_interval_secs: 60,
        },
        downgrade_sweep_interval_secs: 60,
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.subject).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Records generation requests; can be switched to reject them.
#[derive(Default)]
pub struct RecordingGateway {
    chapters: Mutex<Vec<ChapterGenerationRequest>>,
    similar: Mutex<Vec<SimilarQuestionRequest>>,
    failing: Mutex<bool>,
}

impl RecordingGateway {
    pub fn chapter_requests(&self) -> Vec<ChapterGenerationRequest> {
        self.chapters.lock().unwrap().clone()
    }

    pub fn similar_requests(&self) -> Vec<SimilarQuestionRequest> {
        self.similar.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<(), GenerationApiError> {
        if *self.failing.lock().unwrap() {
            return Err(GenerationApiError::Api {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GenerationGateway for RecordingGateway {
    async fn submit_chapter(
        &self,
        request: &ChapterGenerationRequest,
    ) -> Result<(), GenerationApiError> {
        self.check()?;
        self.chapters.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn submit_similar(
        &self,
        request: &SimilarQuestionRequest,
    ) -> Result<(), GenerationApiError> {
        self.check()?;
        self.similar.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Identity provider that returns a fixed profile for any code except
/// `"bad-code"`.
pub struct FakeIdentity {
    pub profile: ExternalProfile,
}

impl FakeIdentity {
    pub fn new(external_id: &str, email: &str, name: &str) -> Self {
        Self {
            profile: ExternalProfile {
                external_id: external_id.to_string(),
                email: email.to_string(),
                name: name.to_string(),
                image: None,
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://accounts.example.test/auth?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalProfile, OAuthError> {
        if code == "bad-code" {
            return Err(OAuthError::Provider {
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(self.profile.clone())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub config: ServerConfig,
    pub mailer: Arc<RecordingMailer>,
    pub gateway: Arc<RecordingGateway>,
}

impl TestApp {
    /// A fresh handle to the router for one request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Create a user and a session token for them.
    pub async fn user(&self, email: &str) -> (User, String) {
        let user = UserRepo::create(
            &self.pool,
            &CreateUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                image: None,
            },
        )
        .await
        .unwrap();
        let token = jwt::issue_session(user.id, Some(&user.email), &self.config.jwt).unwrap();
        (user, token)
    }
}

/// Build the application with recording doubles and no identity provider.
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, test_config(), None)
}

/// Build the application through the production [`build_app_router`].
pub fn build_test_app_with(
    pool: PgPool,
    config: ServerConfig,
    identity: Option<Arc<dyn IdentityProvider>>,
) -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    let gateway = Arc::new(RecordingGateway::default());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        mailer: mailer.clone(),
        generation: gateway.clone(),
        identity,
    };

    TestApp {
        router: build_app_router(state, &config),
        pool,
        config,
        mailer,
        gateway,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not valid JSON")
}

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

/// Send a GET request without credentials.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Send a GET request with a bearer token.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Send a POST request with a JSON body and no credentials.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, json_request(Method::POST, uri, None, &body)).await
}

/// Send a POST request with a JSON body and a bearer token.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, json_request(Method::POST, uri, Some(token), &body)).await
}

/// Send a PUT request with a JSON body and a bearer token.
pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, json_request(Method::PUT, uri, Some(token), &body)).await
}

/// Send a DELETE request with a bearer token.
pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request carrying the given `Cookie` header.
pub async fn get_with_cookie(app: Router, uri: &str, cookie: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Encode text fields (and optional file parts) as `multipart/form-data`.
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Send a multipart POST with a bearer token.
pub async fn post_multipart_auth(app: Router, uri: &str, token: &str, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Poll `condition` until it holds, for up to two seconds. Generation
/// requests are sent from spawned tasks.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a notebook through the API and return its id.
pub async fn create_notebook(app: &TestApp, token: &str, title: &str) -> i64 {
    let response = post_json_auth(
        app.app(),
        "/api/notebooks/new",
        token,
        serde_json::json!({ "title": title }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Upload a chapter through the API and return its id.
pub async fn create_chapter(app: &TestApp, token: &str, notebook_id: i64, title: &str) -> i64 {
    let body = multipart_body(
        &[
            ("title", title),
            ("text", "Mitochondria produce ATP through oxidative phosphorylation."),
            ("question_style", "Clinical"),
            ("num_questions", "3"),
            ("use_bolding", "on"),
        ],
        &[],
    );
    let response = post_multipart_auth(
        app.app(),
        &format!("/api/notebooks/{notebook_id}/chapters/new"),
        token,
        body,
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// A question payload as the generation service sends it.
pub fn generated_question(text: &str, correct: &str, wrong: &str) -> serde_json::Value {
    serde_json::json!({
        "question": text,
        "answerChoices": [
            { "value": correct, "correct": true },
            { "value": wrong, "correct": false }
        ],
        "explanation": "Because.",
        "concept": "Energy"
    })
}
