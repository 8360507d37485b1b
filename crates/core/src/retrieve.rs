use crate::embeddings::Embedder;
use crate::error::AlignError;
use crate::models::{DocType, Party, PassageFilter, ScoredPassage};
use crate::periods::date_to_int;
use crate::traits::VectorIndex;
use chrono::NaiveDate;

pub const DEFAULT_TOP_K: usize = 50;

/// Filtered-similarity primitive: embeds a query once and searches the
/// store under the full {party, type, date-range} predicate conjunction.
/// No period-awareness lives here; callers widen manifesto windows
/// themselves before calling.
pub struct Retriever<E, S>
where
    E: Embedder,
    S: VectorIndex,
{
    embedder: E,
    store: S,
    top_k: usize,
}

impl<E, S> Retriever<E, S>
where
    E: Embedder,
    S: VectorIndex,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn retrieve(
        &self,
        query: &str,
        party: Party,
        start_date: NaiveDate,
        end_date: NaiveDate,
        doc_type: DocType,
    ) -> Result<Vec<ScoredPassage>, AlignError> {
        self.retrieve_window(
            query,
            party,
            date_to_int(start_date),
            date_to_int(end_date),
            doc_type,
        )
        .await
    }

    /// Same search over an already-canonicalized `YYYYMMDD` window, as
    /// produced by legislative-period snapping.
    pub async fn retrieve_window(
        &self,
        query: &str,
        party: Party,
        start_date: u32,
        end_date: u32,
        doc_type: DocType,
    ) -> Result<Vec<ScoredPassage>, AlignError> {
        if query.trim().is_empty() {
            return Err(AlignError::EmptyQuery);
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let filter = PassageFilter {
            party,
            doc_type,
            start_date,
            end_date,
        };

        Ok(self
            .store
            .query_similar(&query_vector, self.top_k, &filter)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::models::{EmbeddedPassage, Passage};
    use crate::stores::MemoryStore;

    fn embedded(party: Party, doc_type: DocType, date: u32, content: &str) -> EmbeddedPassage {
        let embedder = HashEmbedder::default();
        EmbeddedPassage {
            vector: embedder.embed(content),
            passage: Passage {
                chunk_id: format!("{date}-{content}"),
                source_id: date.to_string(),
                party,
                doc_type,
                date,
                content: content.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn retrieval_filters_by_type_within_the_window() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                embedded(
                    Party::Spd,
                    DocType::Speech,
                    20220310,
                    "Das Klimageld kommt.",
                ),
                embedded(
                    Party::Spd,
                    DocType::Speech,
                    20221205,
                    "Der Klimaschutz braucht Tempo.",
                ),
                embedded(
                    Party::Spd,
                    DocType::Manifesto,
                    20211026,
                    "Klimaneutralität bis 2045.",
                ),
            ])
            .await
            .unwrap();

        let retriever = Retriever::new(HashEmbedder::default(), store);
        let hits = retriever
            .retrieve(
                "climate",
                Party::Spd,
                "2021-10-26".parse().unwrap(),
                "2023-01-01".parse().unwrap(),
                DocType::Speech,
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.passage.doc_type == DocType::Speech));
    }

    #[tokio::test]
    async fn top_k_bounds_the_result_size() {
        let store = MemoryStore::new();
        let mut batch = Vec::new();
        for day in 1..=9u32 {
            batch.push(embedded(
                Party::Linke,
                DocType::Speech,
                20220100 + day,
                &format!("Rede Nummer {day}"),
            ));
        }
        store.upsert(&batch).await.unwrap();

        let retriever = Retriever::new(HashEmbedder::default(), store).with_top_k(3);
        let hits = retriever
            .retrieve(
                "Rede",
                Party::Linke,
                "2022-01-01".parse().unwrap(),
                "2022-01-31".parse().unwrap(),
                DocType::Speech,
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn empty_match_is_a_valid_empty_result() {
        let retriever = Retriever::new(HashEmbedder::default(), MemoryStore::new());
        let hits = retriever
            .retrieve(
                "Wohnungsbau",
                Party::Afd,
                "2022-01-01".parse().unwrap(),
                "2022-12-31".parse().unwrap(),
                DocType::Speech,
            )
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let retriever = Retriever::new(HashEmbedder::default(), MemoryStore::new());
        let result = retriever
            .retrieve(
                "   ",
                Party::Spd,
                "2022-01-01".parse().unwrap(),
                "2022-12-31".parse().unwrap(),
                DocType::Speech,
            )
            .await;
        assert!(matches!(result, Err(AlignError::EmptyQuery)));
    }
}
