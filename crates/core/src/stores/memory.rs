use crate::align::cosine_similarity;
use crate::error::ProviderError;
use crate::models::{EmbeddedPassage, PassageFilter, ScoredPassage};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory vector index with brute-force cosine search and the same
/// filter semantics as the Qdrant store. Suitable for tests and small
/// offline corpora, not for production volumes.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<EmbeddedPassage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryStore {
    async fn upsert(&self, passages: &[EmbeddedPassage]) -> Result<(), ProviderError> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.extend_from_slice(passages);
        Ok(())
    }

    async fn count(&self) -> Result<u64, ProviderError> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.len() as u64)
    }

    async fn query_similar(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &PassageFilter,
    ) -> Result<Vec<ScoredPassage>, ProviderError> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut hits: Vec<ScoredPassage> = entries
            .iter()
            .filter(|entry| filter.matches(&entry.passage))
            .map(|entry| ScoredPassage {
                passage: entry.passage.clone(),
                score: cosine_similarity(query_vector, &entry.vector),
                vector: entry.vector.clone(),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocType, Party, Passage};

    fn embedded(id: &str, doc_type: DocType, date: u32, vector: Vec<f32>) -> EmbeddedPassage {
        EmbeddedPassage {
            passage: Passage {
                chunk_id: id.to_string(),
                source_id: id.to_string(),
                party: Party::Spd,
                doc_type,
                date,
                content: format!("passage {id}"),
            },
            vector,
        }
    }

    fn spd_speech_filter() -> PassageFilter {
        PassageFilter {
            party: Party::Spd,
            doc_type: DocType::Speech,
            start_date: 20211026,
            end_date: 20230101,
        }
    }

    #[tokio::test]
    async fn count_tracks_upserts() {
        let store = MemoryStore::new();
        assert_eq!(store.count().await.unwrap(), 0);

        store
            .upsert(&[embedded("a", DocType::Speech, 20220101, vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        // No dedup at this layer: re-upserting duplicates.
        store
            .upsert(&[embedded("a", DocType::Speech, 20220101, vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn results_are_ordered_by_descending_similarity() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                embedded("orthogonal", DocType::Speech, 20220101, vec![0.0, 1.0]),
                embedded("identical", DocType::Speech, 20220102, vec![1.0, 0.0]),
                embedded("between", DocType::Speech, 20220103, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        let hits = store
            .query_similar(&[1.0, 0.0], 10, &spd_speech_filter())
            .await
            .unwrap();

        let ids: Vec<&str> = hits.iter().map(|hit| hit.passage.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["identical", "between", "orthogonal"]);
    }

    #[tokio::test]
    async fn doc_type_filter_excludes_other_types() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                embedded("speech-1", DocType::Speech, 20220101, vec![1.0, 0.0]),
                embedded("speech-2", DocType::Speech, 20220601, vec![0.9, 0.1]),
                embedded("manifesto", DocType::Manifesto, 20211026, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store
            .query_similar(&[1.0, 0.0], 10, &spd_speech_filter())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits
            .iter()
            .all(|hit| hit.passage.doc_type == DocType::Speech));
    }

    #[tokio::test]
    async fn fewer_than_k_results_is_valid() {
        let store = MemoryStore::new();
        store
            .upsert(&[embedded("only", DocType::Speech, 20220101, vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store
            .query_similar(&[1.0, 0.0], 50, &spd_speech_filter())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn empty_filter_match_is_an_empty_result_not_an_error() {
        let store = MemoryStore::new();
        let hits = store
            .query_similar(&[1.0, 0.0], 10, &spd_speech_filter())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
