use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use party_align_core::{
    ingest_if_empty, ingest_records, read_source_records, AlignmentAnalyzer, ChunkStrategy,
    GeminiEmbedder, GeminiGenerator, IngestionOptions, IngestionOutcome, IngestionReport, Party,
    QdrantStore, Retriever, ALL_PARTIES, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_GENERATION_MODEL, DEFAULT_TOP_K,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "party-align", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "political_passages")]
    qdrant_collection: String,

    /// Google Generative Language API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: String,

    /// Embedding model name
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Embedding vector dimensionality
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Generation model name
    #[arg(long, default_value = DEFAULT_GENERATION_MODEL)]
    generation_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest CSV corpora into the vector store, skipping when it is
    /// already populated.
    Ingest {
        /// Speeches CSV (type, date, id, party, text)
        #[arg(long)]
        speeches: PathBuf,
        /// Manifestos CSV (same schema)
        #[arg(long)]
        manifestos: Option<PathBuf>,
        /// Maximum chunk size in characters
        #[arg(long, default_value_t = 500)]
        chunk_size: usize,
        /// Chunk overlap in characters
        #[arg(long, default_value_t = 200)]
        chunk_overlap: usize,
        /// Chunks per embed-and-upsert batch
        #[arg(long, default_value_t = 64)]
        batch_size: usize,
        /// Ingest even when the store already holds vectors. Duplicates
        /// existing entries.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Answer a topic question for one party and report the alignment
    /// metric.
    Ask {
        #[arg(long)]
        query: String,
        /// Party label, normalized onto the canonical vocabulary
        #[arg(long)]
        party: String,
        /// Window start (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,
        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Score several parties concurrently on one topic and window.
    Compare {
        #[arg(long)]
        query: String,
        /// Party label; repeat for more. Defaults to all parties.
        #[arg(long = "party")]
        parties: Vec<String>,
        /// Window start (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,
        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = QdrantStore::new(
        &cli.qdrant_url,
        &cli.qdrant_collection,
        cli.embedding_dimensions,
    );
    store
        .ensure_collection()
        .await
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    let embedder = GeminiEmbedder::new(
        &cli.google_api_key,
        &cli.embedding_model,
        cli.embedding_dimensions,
    )
    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        collection = %cli.qdrant_collection,
        "party-align boot"
    );

    match cli.command {
        Command::Ingest {
            speeches,
            manifestos,
            chunk_size,
            chunk_overlap,
            batch_size,
            force,
        } => {
            let options = IngestionOptions {
                chunk_max_chars: chunk_size,
                chunk_overlap_chars: chunk_overlap,
                strategy: ChunkStrategy::Sentence,
                batch_size,
            };

            let mut sources = vec![speeches.as_path()];
            if let Some(manifestos) = manifestos.as_deref() {
                sources.push(manifestos);
            }

            let report = if force {
                let mut combined = IngestionReport::default();
                for path in &sources {
                    let records = read_source_records(path)
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                    let report = ingest_records(&records, &embedder, &store, &options)
                        .await
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                    combined.merge(report);
                }
                combined
            } else {
                match ingest_if_empty(&sources, &embedder, &store, &options)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?
                {
                    IngestionOutcome::Skipped { existing } => {
                        info!(existing, "vector store already populated, skipping ingestion");
                        println!("store already holds {existing} vectors, nothing ingested");
                        return Ok(());
                    }
                    IngestionOutcome::Completed(report) => report,
                }
            };

            for skipped in &report.skipped {
                warn!(
                    row = skipped.row,
                    source_id = %skipped.source_id,
                    reason = %skipped.reason,
                    "skipped record"
                );
            }

            println!(
                "{} chunks from {} records ingested ({} records skipped)",
                report.stored_chunks,
                report.stored_records,
                report.skipped.len()
            );
        }
        Command::Ask {
            query,
            party,
            start_date,
            end_date,
            top_k,
        } => {
            let party = Party::from_label(&party)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let generator = GeminiGenerator::new(&cli.google_api_key, &cli.generation_model)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let retriever = Retriever::new(embedder, store).with_top_k(top_k);
            let analyzer = AlignmentAnalyzer::new(retriever, generator);

            let (narrative, metric) = analyzer
                .answer(&query, party, start_date, end_date)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("party: {party}");
            println!("alignment: {metric}");
            println!("{narrative}");
        }
        Command::Compare {
            query,
            parties,
            start_date,
            end_date,
            top_k,
        } => {
            let parties = if parties.is_empty() {
                ALL_PARTIES.to_vec()
            } else {
                parties
                    .iter()
                    .map(|label| Party::from_label(label))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?
            };

            let generator = GeminiGenerator::new(&cli.google_api_key, &cli.generation_model)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let retriever = Retriever::new(embedder, store).with_top_k(top_k);
            let analyzer = Arc::new(AlignmentAnalyzer::new(retriever, generator));

            let report = analyzer
                .score_parties(&query, &parties, start_date, end_date)
                .await;

            for failure in &report.failures {
                warn!(party = %failure.party, reason = %failure.reason, "party scoring failed");
            }

            for (party, outcome) in &report.outcomes {
                println!("== {party} ==");
                println!("label: {}", outcome.qualitative_label);
                println!("alignment: {}", outcome.content_similarity);
                println!("{}\n", outcome.narrative_summary);
            }

            if report.outcomes.is_empty() {
                println!("no party could be scored for this request");
            }
        }
    }

    Ok(())
}
