//! Structured-completion client.
//!
//! A thin contract over an external text-generation API: given a prompt and
//! an API key, return the generated text (expected to contain a JSON object).
//! The key is passed per call because it belongs to the requesting user.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::CompletionConfig;
use crate::error::{Result, TaskError};

/// Text completion contract consumed by the command interpreter.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Stable provider identifier for logs.
    fn name(&self) -> &str;

    /// Generate text for `prompt` using `api_key`.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Credential`] when the provider rejects the key.
    /// - [`TaskError::Completion`] for transport, rate-limit or server failures.
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String>;
}

/// Google Generative Language (`generateContent`) adapter.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| TaskError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Map an HTTP error status to the appropriate [`TaskError`].
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> TaskError {
        let message = extract_error_message(body);
        let key_rejected = body.contains("API_KEY_INVALID") || body.contains("API key not valid");
        match status.as_u16() {
            401 | 403 => TaskError::Credential(format!("completion key rejected: {message}")),
            400 if key_rejected => {
                TaskError::Credential(format!("completion key rejected: {message}"))
            }
            429 => TaskError::Completion(format!("completion rate limited: {message}")),
            code => TaskError::Completion(format!("completion HTTP {code}: {message}")),
        }
    }
}

/// Extract an error message from a provider error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Pull the first candidate's text out of a `generateContent` response.
fn extract_candidate_text(body: &serde_json::Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(serde_json::Value::as_str))
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskError::Completion(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TaskError::Completion(format!("completion response not JSON: {e}")))?;

        extract_candidate_text(&json).ok_or_else(|| {
            TaskError::Interpretation("completion response contained no text".to_owned())
        })
    }
}
