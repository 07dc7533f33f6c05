//! GeminiBackend -- concrete [`ChatBackend`] implementation for Google Gemini.
//!
//! Sends requests to the Generative Language API
//! (`/v1beta/models/{model}:generateContent`). The REST API is stateless, so a
//! session is the accumulated `contents` list resent on every turn.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use relaybot_core::llm::backend::ChatBackend;
use relaybot_types::chat::{ImageAttachment, Turn};
use relaybot_types::error::BackendError;

use super::types::{Content, GenerateContentRequest, GenerateContentResponse};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Per-conversation Gemini state.
#[derive(Debug, Clone, Default)]
pub struct GeminiSession {
    pub model: String,
    pub contents: Vec<Content>,
}

/// Google Gemini chat backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    default_model: String,
}

impl GeminiBackend {
    /// Create a backend for `default_model`, used by one-shot generation.
    pub fn new(api_key: SecretString, default_model: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| BackendError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: default_model.into(),
        })
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// Send `contents` and return the first candidate's text.
    async fn generate(&self, model: &str, contents: &[Content]) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&GenerateContentRequest { contents })
            .send()
            .await
            .map_err(|e| BackendError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => BackendError::AuthenticationFailed,
                429 => BackendError::RateLimited,
                _ => BackendError::Request(format!("HTTP {status}: {error_body}")),
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Deserialization(format!("failed to parse response: {e}")))?;

        match body.first_text() {
            Some(text) => Ok(text),
            None => {
                let block_reason = body.prompt_feedback.and_then(|f| f.block_reason);
                debug!(model, ?block_reason, "Gemini returned no candidate text");
                Err(BackendError::EmptyResponse)
            }
        }
    }
}

impl ChatBackend for GeminiBackend {
    type Session = GeminiSession;

    fn name(&self) -> &str {
        "gemini"
    }

    async fn create_session(&self, model: &str, history: Vec<Turn>) -> Result<GeminiSession, BackendError> {
        Ok(GeminiSession {
            model: model.to_string(),
            contents: history.iter().map(Content::from).collect(),
        })
    }

    async fn send_turn(
        &self,
        session: &mut GeminiSession,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, BackendError> {
        let user = match image {
            Some(image) => Content::user_with_image(text, image),
            None => Content::user_text(text),
        };

        session.contents.push(user);
        match self.generate(&session.model, &session.contents).await {
            Ok(reply) => {
                session.contents.push(Content::model_text(&reply));
                Ok(reply)
            }
            Err(e) => {
                // A failed turn leaves the history as it was
                session.contents.pop();
                Err(e)
            }
        }
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, BackendError> {
        self.generate(&self.default_model, &[Content::user_text(prompt)])
            .await
    }
}
