use crate::error::ProviderError;
use crate::models::{DocType, EmbeddedPassage, Party, Passage, PassageFilter, ScoredPassage};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    /// Create the collection with cosine distance if it does not exist
    /// yet. Run once at startup; a malformed endpoint fails here rather
    /// than on the first query.
    pub async fn ensure_collection(&self) -> Result<(), ProviderError> {
        url::Url::parse(&self.endpoint)?;

        let response = self
            .client
            .get(format!("{}/collections/{}", self.endpoint, self.collection))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(ProviderError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BackendResponse {
                backend: "qdrant".to_string(),
                details: format!("collection setup failed with {}", response.status()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn upsert(&self, passages: &[EmbeddedPassage]) -> Result<(), ProviderError> {
        let points = passages
            .iter()
            .map(|embedded| {
                if embedded.vector.len() != self.vector_size {
                    return Err(ProviderError::Request(format!(
                        "embedding dimension {} != {}",
                        embedded.vector.len(),
                        self.vector_size
                    )));
                }

                let passage = &embedded.passage;
                Ok(json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": embedded.vector,
                    "payload": {
                        "chunk_id": passage.chunk_id,
                        "source_id": passage.source_id,
                        "party": passage.party.as_str(),
                        "doc_type": passage.doc_type.as_str(),
                        "date": passage.date,
                        "content": passage.content,
                    },
                }))
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, ProviderError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/count",
                self.endpoint, self.collection
            ))
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .ok_or_else(|| ProviderError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "count response has no result.count".to_string(),
            })
    }

    async fn query_similar(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &PassageFilter,
    ) -> Result<Vec<ScoredPassage>, ProviderError> {
        if query_vector.len() != self.vector_size {
            return Err(ProviderError::Request(format!(
                "query vector dimension {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let body = json!({
            "vector": query_vector,
            "limit": top_k,
            "with_payload": true,
            "with_vector": true,
            "filter": {
                "must": [
                    { "key": "party", "match": { "value": filter.party.as_str() } },
                    { "key": "doc_type", "match": { "value": filter.doc_type.as_str() } },
                    { "key": "date", "range": { "gte": filter.start_date, "lte": filter.end_date } },
                ]
            },
        });

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::with_capacity(hits.len());
        for hit in hits {
            result.push(parse_hit(&hit)?);
        }

        Ok(result)
    }
}

fn parse_hit(hit: &Value) -> Result<ScoredPassage, ProviderError> {
    let payload_str = |pointer: &str| -> String {
        hit.pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let party_label = payload_str("/payload/party");
    let party = Party::from_label(&party_label).map_err(|_| ProviderError::BackendResponse {
        backend: "qdrant".to_string(),
        details: format!("payload carries unknown party {party_label:?}"),
    })?;

    let doc_type_label = payload_str("/payload/doc_type");
    let doc_type =
        DocType::from_label(&doc_type_label).map_err(|_| ProviderError::BackendResponse {
            backend: "qdrant".to_string(),
            details: format!("payload carries unknown doc_type {doc_type_label:?}"),
        })?;

    let date = hit
        .pointer("/payload/date")
        .and_then(Value::as_u64)
        .ok_or_else(|| ProviderError::BackendResponse {
            backend: "qdrant".to_string(),
            details: "payload has no integer date".to_string(),
        })? as u32;

    // Cosine similarity straight from the store, higher is more similar.
    let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;

    let vector = hit
        .pointer("/vector")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_f64)
                .map(|value| value as f32)
                .collect::<Vec<f32>>()
        })
        .ok_or_else(|| ProviderError::BackendResponse {
            backend: "qdrant".to_string(),
            details: "hit has no vector; search must request with_vector".to_string(),
        })?;

    Ok(ScoredPassage {
        passage: Passage {
            chunk_id: payload_str("/payload/chunk_id"),
            source_id: payload_str("/payload/source_id"),
            party,
            doc_type,
            date,
            content: payload_str("/payload/content"),
        },
        score,
        vector,
    })
}
