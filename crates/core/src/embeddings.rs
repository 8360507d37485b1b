use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

pub(crate) const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_MAX_RETRIES: usize = 4;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::Request("empty embedding response".to_string()))
    }
}

/// POST a JSON body, retrying rate limits (429), server errors and network
/// failures with exponential backoff. Other client errors fail immediately.
pub(crate) async fn post_json_with_backoff(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
    backend: &str,
    max_retries: usize,
) -> Result<Value, ProviderError> {
    let mut last_error: Option<ProviderError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // 1s, 2s, 4s, 8s, ... capped at 32s
            let delay = Duration::from_secs(1u64 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match client.post(url).json(body).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let details = response.text().await.unwrap_or_default();
                let error = ProviderError::BackendResponse {
                    backend: backend.to_string(),
                    details: format!("{status}: {details}"),
                };

                if status.as_u16() == 429 || status.is_server_error() {
                    last_error = Some(error);
                    continue;
                }
                return Err(error);
            }
            Err(error) => {
                last_error = Some(ProviderError::Http(error));
                continue;
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ProviderError::Request(format!("{backend} request failed after retries"))
    }))
}

/// Embedding provider backed by the Google Generative Language API
/// (`models/{model}:batchEmbedContents`).
pub struct GeminiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
    max_retries: usize,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
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
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [ { "text": text } ] },
                })
            })
            .collect();

        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.endpoint, self.model, self.api_key
        );

        let parsed = post_json_with_backoff(
            &self.client,
            &url,
            &json!({ "requests": requests }),
            "gemini-embeddings",
            self.max_retries,
        )
        .await?;

        let entries = parsed
            .pointer("/embeddings")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::BackendResponse {
                backend: "gemini-embeddings".to_string(),
                details: "response has no embeddings array".to_string(),
            })?;

        if entries.len() != texts.len() {
            return Err(ProviderError::BackendResponse {
                backend: "gemini-embeddings".to_string(),
                details: format!(
                    "embedding count {} does not match input count {}",
                    entries.len(),
                    texts.len()
                ),
            });
        }

        let mut vectors = Vec::with_capacity(entries.len());
        for entry in entries {
            let raw = entry
                .pointer("/values")
                .and_then(Value::as_array)
                .ok_or_else(|| ProviderError::BackendResponse {
                    backend: "gemini-embeddings".to_string(),
                    details: "embedding entry has no values".to_string(),
                })?;

            let vector: Vec<f32> = raw
                .iter()
                .filter_map(Value::as_f64)
                .map(|value| value as f32)
                .collect();

            if vector.len() != self.dimensions {
                return Err(ProviderError::BackendResponse {
                    backend: "gemini-embeddings".to_string(),
                    details: format!(
                        "embedding dimension {} does not match configured {}",
                        vector.len(),
                        self.dimensions
                    ),
                });
            }
            vectors.push(vector);
        }

        Ok(vectors)
    }
}

/// Deterministic character-trigram embedder. No network, no model: each
/// trigram is FNV-hashed into a bucket and the vector L2-normalized.
/// Useful for offline runs and as the basis for test doubles.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimensions: 128 }
    }
}

impl HashEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashEmbedder};

    #[test]
    fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let first = embedder.embed("Klimaschutz und Energiewende");
        let second = embedder.embed("Klimaschutz und Energiewende");
        assert_eq!(first, second);
    }

    #[test]
    fn hash_embedder_outputs_configured_length() {
        let embedder = HashEmbedder { dimensions: 32 };
        assert_eq!(embedder.embed("abc").len(), 32);
        assert_eq!(embedder.embed("").len(), 32);
    }

    #[tokio::test]
    async fn embed_query_returns_a_single_vector() {
        let embedder = HashEmbedder::default();
        let vector = embedder.embed_query("Rente").await.unwrap();
        assert_eq!(vector.len(), embedder.dimensions());
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let embedder = HashEmbedder::default();
        let texts = vec!["erstens".to_string(), "zweitens".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], embedder.embed("erstens"));
        assert_eq!(vectors[1], embedder.embed("zweitens"));
    }
}
