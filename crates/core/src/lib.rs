pub mod align;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod periods;
pub mod retrieve;
pub mod stores;
pub mod traits;

pub use align::{
    centroid, content_alignment, cosine_similarity, AlignmentAnalyzer, PartyAlignmentReport,
    PartyFailure,
};
pub use chunking::{chunk_by_sentence, chunk_by_window, chunk_text, split_sentences, ChunkingConfig};
pub use embeddings::{
    Embedder, GeminiEmbedder, HashEmbedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
pub use error::{AlignError, IngestError, ProviderError};
pub use generation::{GeminiGenerator, TextGenerator, DEFAULT_GENERATION_MODEL};
pub use ingest::{
    ingest_if_empty, ingest_records, read_source_records, IngestionOutcome, IngestionReport,
    SkippedRecord,
};
pub use models::{
    AlignmentLabel, AlignmentOutcome, ChunkStrategy, ContentAlignment, DocType, EmbeddedPassage,
    IngestionOptions, Party, Passage, PassageFilter, ScoredPassage, SourceRecord, ALL_PARTIES,
};
pub use periods::{
    convert_date, date_to_int, period_containing, snap_to_periods, Period, LEGISLATIVE_PERIODS,
};
pub use retrieve::{Retriever, DEFAULT_TOP_K};
pub use stores::{MemoryStore, QdrantStore};
pub use traits::VectorIndex;
