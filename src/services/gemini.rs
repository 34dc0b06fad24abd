//! Gemini REST transport
//!
//! Implements the remote call primitive against the Google Gemini
//! `generateContent` endpoint. The client carries no per-request timeout;
//! the executor owns the wall-clock bound for each attempt.

use crate::error::RemoteError;
use crate::schemas::gemini::{GeminiErrorBody, GeminiRequest, GeminiResponse, GenerationConfig};
use crate::services::generator::RemoteGenerator;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Gemini API. The API key is supplied per call by the
/// executor, so a single client serves the whole key pool.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: Option<String>,
}

impl GeminiClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Override the API base URL (testing, regional endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(GEMINI_API_BASE)
    }
}

#[async_trait]
impl RemoteGenerator for GeminiClient {
    async fn call(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, RemoteError> {
        let url = format!("{}/models/{}:generateContent", self.base_url(), model);
        let request = GeminiRequest::from_prompt(prompt, config.clone());

        tracing::debug!(model = %model, url = %url, "calling Gemini generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            // Prefer the structured API error message when the body parses.
            if let Ok(body) = serde_json::from_str::<GeminiErrorBody>(&error_text) {
                return Err(RemoteError::with_status(
                    status.as_u16(),
                    body.error.message,
                ));
            }
            return Err(RemoteError::with_status(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::new(format!("failed to read response body: {e}")))?;

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "failed to parse Gemini response");
            RemoteError::new(format!("failed to parse response: {e}"))
        })?;

        parsed
            .text()
            .ok_or_else(|| RemoteError::new("response contained no candidates"))
    }
}
