use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical party vocabulary. Source data spells these many ways
/// ("greens", "BÜNDNIS 90/DIE GRÜNEN", "CDU", ...); everything must be
/// reconciled onto this enum before it reaches the store or a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Party {
    Afd,
    Spd,
    CduCsu,
    Gruene,
    Linke,
}

/// All parties covered by the corpus, in display order.
pub const ALL_PARTIES: [Party; 5] = [
    Party::Afd,
    Party::Spd,
    Party::CduCsu,
    Party::Gruene,
    Party::Linke,
];

impl Party {
    /// The canonical label stored as chunk metadata and matched by filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Afd => "AfD",
            Party::Spd => "SPD",
            Party::CduCsu => "CDU/CSU",
            Party::Gruene => "BÜNDNIS 90/DIE GRÜNEN",
            Party::Linke => "Die Linke",
        }
    }

    /// Normalize a source-specific spelling onto the canonical vocabulary.
    /// Labels outside the vocabulary are rejected, never passed through.
    pub fn from_label(label: &str) -> Result<Self, IngestError> {
        let folded = label.trim().to_lowercase();
        match folded.as_str() {
            "afd" | "alternative für deutschland" => Ok(Party::Afd),
            "spd" | "sozialdemokratische partei deutschlands" => Ok(Party::Spd),
            "cdu/csu" | "cducsu" | "cdu" | "csu" | "union" => Ok(Party::CduCsu),
            "bündnis 90/die grünen"
            | "bündnis90/die grünen"
            | "b90/grüne"
            | "die grünen"
            | "grüne"
            | "greens" => Ok(Party::Gruene),
            "die linke" | "die linke." | "linke" => Ok(Party::Linke),
            _ => Err(IngestError::UnknownParty(label.to_string())),
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    Manifesto,
    Speech,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Manifesto => "manifesto",
            DocType::Speech => "speech",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, IngestError> {
        match label.trim().to_lowercase().as_str() {
            "manifesto" => Ok(DocType::Manifesto),
            "speech" => Ok(DocType::Speech),
            _ => Err(IngestError::UnknownDocType(label.to_string())),
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One row of the tabular source: `type, date, id, party, text` with the
/// date still in its `DD.MM.YYYY` source form.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRecord {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub date: String,
    pub id: String,
    pub party: String,
    pub text: String,
}

/// The atomic unit of storage and retrieval: a bounded text segment with
/// the source record's metadata copied verbatim. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub chunk_id: String,
    pub source_id: String,
    pub party: Party,
    pub doc_type: DocType,
    /// Canonical `YYYYMMDD` integer. No passage is stored with any other
    /// date representation.
    pub date: u32,
    pub content: String,
}

/// A passage paired with its embedding vector, the unit of upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedPassage {
    pub passage: Passage,
    pub vector: Vec<f32>,
}

/// A retrieval hit. `score` is cosine similarity, higher is more similar;
/// the stored vector rides along so centroids never re-embed.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
    pub vector: Vec<f32>,
}

/// Conjunctive metadata filter. Every store query carries all three
/// predicates; the date range is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassageFilter {
    pub party: Party,
    pub doc_type: DocType,
    pub start_date: u32,
    pub end_date: u32,
}

impl PassageFilter {
    pub fn matches(&self, passage: &Passage) -> bool {
        passage.party == self.party
            && passage.doc_type == self.doc_type
            && passage.date >= self.start_date
            && passage.date <= self.end_date
    }
}

/// Centroid cosine similarity of the two retrieved sets, or the sentinel
/// when either set came back empty. Never a fabricated zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentAlignment {
    Score(f32),
    NotEnoughData,
}

impl fmt::Display for ContentAlignment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentAlignment::Score(value) => write!(formatter, "{:.1}%", value * 100.0),
            ContentAlignment::NotEnoughData => formatter.write_str("not enough data"),
        }
    }
}

/// The four-step ladder the label model is allowed to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentLabel {
    NotAligned,
    PartlyAligned,
    MostlyAligned,
    WellAligned,
}

impl AlignmentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentLabel::NotAligned => "Does not align well with manifesto",
            AlignmentLabel::PartlyAligned => "Aligns partly with manifesto",
            AlignmentLabel::MostlyAligned => "Aligns mostly with manifesto",
            AlignmentLabel::WellAligned => "Aligns well with manifesto",
        }
    }

    /// Parse the model's reply. Tolerates surrounding whitespace and
    /// quoting but requires one of the four labels to be present.
    pub fn from_reply(reply: &str) -> Option<Self> {
        let folded = reply.trim().to_lowercase();
        if folded.contains("does not align") {
            Some(AlignmentLabel::NotAligned)
        } else if folded.contains("aligns partly") {
            Some(AlignmentLabel::PartlyAligned)
        } else if folded.contains("aligns mostly") {
            Some(AlignmentLabel::MostlyAligned)
        } else if folded.contains("aligns well") {
            Some(AlignmentLabel::WellAligned)
        } else {
            None
        }
    }
}

impl fmt::Display for AlignmentLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Per-request scoring result. Derived and ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    pub party: Party,
    pub content_similarity: ContentAlignment,
    pub narrative_summary: String,
    pub qualitative_label: AlignmentLabel,
}

/// Chunking strategy selector: sentence-safe for the political corpora,
/// windowed for free-form text without reliable sentence boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    Sentence,
    Window,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub strategy: ChunkStrategy,
    /// Chunks per embed-and-upsert round trip. A performance knob, not a
    /// correctness one: each batch lands fully or fails as a whole.
    pub batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 500,
            chunk_overlap_chars: 200,
            strategy: ChunkStrategy::Sentence,
            batch_size: 64,
        }
    }
}
