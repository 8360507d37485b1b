use crate::embeddings::{post_json_with_backoff, DEFAULT_MAX_RETRIES, GEMINI_API_BASE};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash-lite";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one generation turn under a system instruction and return the
    /// model's text reply.
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}

/// Text generation backed by the Google Generative Language API
/// (`models/{model}:generateContent`).
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_retries: usize,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            endpoint: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Point the client at a different API base, e.g. a local stand-in.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let body = json!({
            "system_instruction": { "parts": [ { "text": system } ] },
            "contents": [ { "role": "user", "parts": [ { "text": user } ] } ],
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );

        let parsed = post_json_with_backoff(
            &self.client,
            &url,
            &body,
            "gemini-generation",
            self.max_retries,
        )
        .await?;

        let text = parsed
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::BackendResponse {
                backend: "gemini-generation".to_string(),
                details: "response has no candidate text".to_string(),
            })?;

        Ok(text.trim().to_string())
    }
}
