use crate::error::ProviderError;
use crate::models::{EmbeddedPassage, PassageFilter, ScoredPassage};
use async_trait::async_trait;

/// The contract the core relies on from a vector index. Implementations
/// must be safe for concurrent read access; the index is effectively
/// read-only once ingestion has finished.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add entries. No dedup key is enforced here; guarding against
    /// double-ingestion is the loader's job.
    async fn upsert(&self, passages: &[EmbeddedPassage]) -> Result<(), ProviderError>;

    /// Total stored entries, the loader's ingestion-gate check.
    async fn count(&self) -> Result<u64, ProviderError>;

    /// Filtered similarity search, ordered by descending cosine
    /// similarity. Returns at most `top_k` hits; fewer is valid whenever
    /// the filtered subset is smaller. Hits carry their stored vectors.
    async fn query_similar(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &PassageFilter,
    ) -> Result<Vec<ScoredPassage>, ProviderError>;
}
