use crate::chunking::{chunk_text, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::models::{
    DocType, EmbeddedPassage, IngestionOptions, Party, Passage, SourceRecord,
};
use crate::periods::convert_date;
use crate::traits::VectorIndex;
use sha2::{Digest, Sha256};
use std::path::Path;

/// A source record that failed normalization and was left out, with the
/// reason for the caller to log. Row numbers count within one source file.
#[derive(Debug)]
pub struct SkippedRecord {
    pub row: usize,
    pub source_id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub stored_records: usize,
    pub stored_chunks: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl IngestionReport {
    pub fn merge(&mut self, other: IngestionReport) {
        self.stored_records += other.stored_records;
        self.stored_chunks += other.stored_chunks;
        self.skipped.extend(other.skipped);
    }
}

/// Outcome of the guarded ingestion entry point: either the store was
/// already populated, or ingestion ran to completion.
#[derive(Debug)]
pub enum IngestionOutcome {
    Skipped { existing: u64 },
    Completed(IngestionReport),
}

/// Read all rows of a `type, date, id, party, text` tabular source.
/// Unknown extra columns are ignored; a missing required column fails the
/// whole file.
pub fn read_source_records(path: &Path) -> Result<Vec<SourceRecord>, IngestError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: SourceRecord = row?;
        records.push(record);
    }
    Ok(records)
}

/// Normalize, chunk, embed and store a record set. Records that fail
/// normalization (unparseable date, unknown party or type, missing text)
/// are skipped and reported; a batch whose embedding or upsert still
/// fails after the provider's own retries aborts ingestion with the
/// error, so nothing is ever silently dropped mid-batch.
///
/// Re-running over the same source duplicates entries; use
/// [`ingest_if_empty`] for the startup path.
pub async fn ingest_records<E, S>(
    records: &[SourceRecord],
    embedder: &E,
    store: &S,
    options: &IngestionOptions,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder,
    S: VectorIndex,
{
    let config = ChunkingConfig {
        max_chars: options.chunk_max_chars,
        overlap_chars: options.chunk_overlap_chars,
    };
    let batch_size = options.batch_size.max(1);

    let mut report = IngestionReport::default();
    let mut pending: Vec<Passage> = Vec::new();

    for (row, record) in records.iter().enumerate() {
        match prepare_record(record, options, config) {
            Ok(passages) => {
                report.stored_records += 1;
                pending.extend(passages);
            }
            Err(error) => report.skipped.push(SkippedRecord {
                row,
                source_id: record.id.clone(),
                reason: error.to_string(),
            }),
        }

        while pending.len() >= batch_size {
            let batch: Vec<Passage> = pending.drain(..batch_size).collect();
            report.stored_chunks += store_batch(&batch, embedder, store).await?;
        }
    }

    if !pending.is_empty() {
        report.stored_chunks += store_batch(&pending, embedder, store).await?;
    }

    Ok(report)
}

/// Startup ingestion gate: skip when the store already holds vectors,
/// otherwise ingest the given sources in order.
pub async fn ingest_if_empty<E, S>(
    sources: &[&Path],
    embedder: &E,
    store: &S,
    options: &IngestionOptions,
) -> Result<IngestionOutcome, IngestError>
where
    E: Embedder,
    S: VectorIndex,
{
    let existing = store.count().await?;
    if existing > 0 {
        return Ok(IngestionOutcome::Skipped { existing });
    }

    let mut combined = IngestionReport::default();
    for path in sources {
        let records = read_source_records(path)?;
        combined.merge(ingest_records(&records, embedder, store, options).await?);
    }

    Ok(IngestionOutcome::Completed(combined))
}

fn prepare_record(
    record: &SourceRecord,
    options: &IngestionOptions,
    config: ChunkingConfig,
) -> Result<Vec<Passage>, IngestError> {
    let doc_type = DocType::from_label(&record.doc_type)?;
    let party = Party::from_label(&record.party)?;
    let date = convert_date(&record.date)?;

    if record.text.trim().is_empty() {
        return Err(IngestError::EmptyText(record.id.clone()));
    }

    let passages = chunk_text(&record.text, options.strategy, config)
        .into_iter()
        .enumerate()
        .map(|(index, content)| Passage {
            chunk_id: make_chunk_id(&record.id, index as u64, &content),
            source_id: record.id.clone(),
            party,
            doc_type,
            date,
            content,
        })
        .collect();

    Ok(passages)
}

async fn store_batch<E, S>(
    batch: &[Passage],
    embedder: &E,
    store: &S,
) -> Result<usize, IngestError>
where
    E: Embedder,
    S: VectorIndex,
{
    let texts: Vec<String> = batch.iter().map(|passage| passage.content.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;

    if vectors.len() != batch.len() {
        return Err(IngestError::Provider(crate::error::ProviderError::Request(
            format!(
                "embedding count {} does not match batch size {}",
                vectors.len(),
                batch.len()
            ),
        )));
    }

    let embedded: Vec<EmbeddedPassage> = batch
        .iter()
        .cloned()
        .zip(vectors)
        .map(|(passage, vector)| EmbeddedPassage { passage, vector })
        .collect();

    store.upsert(&embedded).await?;
    Ok(embedded.len())
}

fn make_chunk_id(source_id: &str, index: u64, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
