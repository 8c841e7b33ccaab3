//! REST client for the generation service.
//!
//! Submissions are acknowledged synchronously; results come back through
//! the API's callback endpoints.

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{ChapterGenerationRequest, SimilarQuestionRequest};

/// Errors from the generation service client.
#[derive(Debug, thiserror::Error)]
pub enum GenerationApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Submits generation work. Implemented by [`GenerationApi`] and by test
/// doubles.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Request questions for a whole chapter.
    async fn submit_chapter(
        &self,
        request: &ChapterGenerationRequest,
    ) -> Result<(), GenerationApiError>;

    /// Request a follow-up question similar to one the user missed.
    async fn submit_similar(
        &self,
        request: &SimilarQuestionRequest,
    ) -> Result<(), GenerationApiError>;
}

/// HTTP client for the generation service.
pub struct GenerationApi {
    client: reqwest::Client,
    api_url: String,
}

impl GenerationApi {
    /// Create a client for the service at `api_url` (no trailing slash)
    /// with a per-request timeout.
    pub fn new(api_url: String, timeout: Duration) -> Result<Self, GenerationApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), GenerationApiError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_url, path))
            .json(body)
            .send()
            .await?;
        Self::ensure_success(response).await
    }

    /// Map a non-2xx response to [`GenerationApiError::Api`].
    async fn ensure_success(response: reqwest::Response) -> Result<(), GenerationApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
        Err(GenerationApiError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl GenerationGateway for GenerationApi {
    async fn submit_chapter(
        &self,
        request: &ChapterGenerationRequest,
    ) -> Result<(), GenerationApiError> {
        self.post("/generate", request).await?;
        tracing::info!(
            chapter_id = %request.chapter_id,
            job_id = ?request.job_id,
            num_questions = request.num_questions,
            "Chapter generation submitted"
        );
        Ok(())
    }

    async fn submit_similar(
        &self,
        request: &SimilarQuestionRequest,
    ) -> Result<(), GenerationApiError> {
        self.post("/similar", request).await?;
        tracing::info!(
            chapter_id = %request.chapter_id,
            question_id = %request.question_id,
            job_id = ?request.job_id,
            "Similar question generation submitted"
        );
        Ok(())
    }
}
