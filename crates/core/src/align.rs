use crate::error::AlignError;
use crate::generation::TextGenerator;
use crate::models::{
    AlignmentLabel, AlignmentOutcome, ContentAlignment, DocType, Party, ScoredPassage,
};
use crate::periods::{date_to_int, snap_to_periods};
use crate::retrieve::Retriever;
use crate::traits::VectorIndex;
use crate::Embedder;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Instruction for the narrative summary over retrieved speech passages.
const NARRATIVE_INSTRUCTION: &str = "You are a helpful assistant. Use the following context \
    to answer the question. Use maximum 7 sentences. Use specific terms. Highlight important ones.";

/// Instruction for the qualitative comparison. The model must answer with
/// exactly one of the four ladder labels, nothing else.
const LABEL_INSTRUCTION: &str = "You are an expert at analyzing political texts and comparing \
their tone and style.
Your task is to analyze how the tone differs between party manifestos and parliamentary \
speeches on the same topic.

Analyze:
- Tone differences (formal vs. informal, assertive vs. cautious, etc.)
- Language style (academic vs. conversational, abstract vs. concrete)
- Rhetorical strategies (promises vs. explanations, vision vs. reality)
- Emotional register (passionate vs. measured, optimistic vs. pragmatic)
- Level of detail and specificity
- Use of technical vs. accessible language
- Coverage of topics: Are the same topics covered in speech as they are in manifestos

Take into account that a manifesto is always written and speeches are spoken. Therefore the \
baseline language is different.
Please judge if the speech reflects well, what the party promised to do. Give only one of \
these labels:
'Does not align well with manifesto', 'Aligns partly with manifesto', 'Aligns mostly with \
manifesto', 'Aligns well with manifesto'.";

/// Cosine similarity between two vectors, in [-1, 1], higher is more
/// similar. Zero-magnitude input yields 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Element-wise mean of a set of vectors. None for an empty set.
pub fn centroid(vectors: &[&[f32]]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut mean = vec![0f32; first.len()];

    for vector in vectors {
        for (slot, value) in mean.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }

    let count = vectors.len() as f32;
    for slot in &mut mean {
        *slot /= count;
    }
    Some(mean)
}

/// Centroid cosine similarity between the two retrieved sets, or the
/// sentinel when either set is empty. Never 0 or NaN for missing data.
pub fn content_alignment(
    speeches: &[ScoredPassage],
    manifestos: &[ScoredPassage],
) -> ContentAlignment {
    let speech_vectors: Vec<&[f32]> = speeches.iter().map(|hit| hit.vector.as_slice()).collect();
    let manifesto_vectors: Vec<&[f32]> =
        manifestos.iter().map(|hit| hit.vector.as_slice()).collect();

    match (centroid(&speech_vectors), centroid(&manifesto_vectors)) {
        (Some(speech_centroid), Some(manifesto_centroid)) => {
            ContentAlignment::Score(cosine_similarity(&speech_centroid, &manifesto_centroid))
        }
        _ => ContentAlignment::NotEnoughData,
    }
}

fn join_passages(hits: &[ScoredPassage]) -> String {
    hits.iter()
        .map(|hit| hit.passage.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug)]
pub struct PartyFailure {
    pub party: Party,
    pub reason: String,
}

/// Fan-out result over several parties: whichever scoring tasks succeeded,
/// plus the failures for the caller to log. A failing party never aborts
/// the rest.
#[derive(Debug, Default)]
pub struct PartyAlignmentReport {
    pub outcomes: BTreeMap<Party, AlignmentOutcome>,
    pub failures: Vec<PartyFailure>,
}

/// Compares a party's spoken record against its written platform: two
/// filtered retrievals, a centroid similarity, and two generation turns.
/// All collaborators are injected; the analyzer owns no global state.
pub struct AlignmentAnalyzer<E, S, G>
where
    E: Embedder,
    S: VectorIndex,
    G: TextGenerator,
{
    retriever: Retriever<E, S>,
    generator: G,
}

impl<E, S, G> AlignmentAnalyzer<E, S, G>
where
    E: Embedder,
    S: VectorIndex,
    G: TextGenerator,
{
    pub fn new(retriever: Retriever<E, S>, generator: G) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Speech passages over the literal window; manifesto passages over
    /// the window widened to full legislative periods, since a manifesto
    /// is valid for its entire period rather than a specific day.
    async fn retrieve_pair(
        &self,
        query: &str,
        party: Party,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(Vec<ScoredPassage>, Vec<ScoredPassage>), AlignError> {
        let speeches = self
            .retriever
            .retrieve(query, party, start_date, end_date, DocType::Speech)
            .await?;

        let (period_start, period_end) =
            snap_to_periods(date_to_int(start_date), date_to_int(end_date))?;
        let manifestos = self
            .retriever
            .retrieve_window(query, party, period_start, period_end, DocType::Manifesto)
            .await?;

        Ok((speeches, manifestos))
    }

    /// Full scoring for one party: content similarity, narrative summary,
    /// and qualitative label. Any retrieval or provider failure propagates
    /// whole; there is no partial outcome at this level.
    pub async fn score(
        &self,
        query: &str,
        party: Party,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AlignmentOutcome, AlignError> {
        let (speeches, manifestos) = self
            .retrieve_pair(query, party, start_date, end_date)
            .await?;

        let content_similarity = content_alignment(&speeches, &manifestos);

        let speech_text = join_passages(&speeches);
        let manifesto_text = join_passages(&manifestos);

        let narrative_summary = self
            .generator
            .generate(
                NARRATIVE_INSTRUCTION,
                &format!("Context: {speech_text}\n\nQuestion: {query}"),
            )
            .await?;

        let reply = self
            .generator
            .generate(
                LABEL_INSTRUCTION,
                &format!(
                    "Compare following manifesto excerpts and parliamentary speeches:\n\n\
                     MANIFESTO EXCERPTS:\n{manifesto_text}\n\n\
                     PARLIAMENTARY SPEECHES:\n{speech_text}\n\n\
                     Give me an alignment label. Only one and without explanation."
                ),
            )
            .await?;
        let qualitative_label =
            AlignmentLabel::from_reply(&reply).ok_or(AlignError::UnknownLabel(reply))?;

        Ok(AlignmentOutcome {
            party,
            content_similarity,
            narrative_summary,
            qualitative_label,
        })
    }

    /// The collaborator surface for API layers: narrative answer plus the
    /// content-alignment metric, without the qualitative-label turn.
    pub async fn answer(
        &self,
        query: &str,
        party: Party,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<(String, ContentAlignment), AlignError> {
        let (speeches, manifestos) = self
            .retrieve_pair(query, party, start_date, end_date)
            .await?;

        let content_similarity = content_alignment(&speeches, &manifestos);
        let speech_text = join_passages(&speeches);

        let narrative_summary = self
            .generator
            .generate(
                NARRATIVE_INSTRUCTION,
                &format!("Context: {speech_text}\n\nQuestion: {query}"),
            )
            .await?;

        Ok((narrative_summary, content_similarity))
    }
}

impl<E, S, G> AlignmentAnalyzer<E, S, G>
where
    E: Embedder + 'static,
    S: VectorIndex + 'static,
    G: TextGenerator + 'static,
{
    /// Score several parties concurrently. Each party's task touches a
    /// disjoint filtered subset and shares no mutable state, so one task
    /// per party with per-task failure isolation: the report carries
    /// whichever outcomes succeeded and the failures for the caller to
    /// log.
    pub async fn score_parties(
        self: &Arc<Self>,
        query: &str,
        parties: &[Party],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> PartyAlignmentReport {
        let mut handles = Vec::with_capacity(parties.len());
        for &party in parties {
            let analyzer = Arc::clone(self);
            let query = query.to_string();
            handles.push((
                party,
                tokio::spawn(async move {
                    analyzer.score(&query, party, start_date, end_date).await
                }),
            ));
        }

        let mut report = PartyAlignmentReport::default();
        for (party, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => {
                    report.outcomes.insert(party, outcome);
                }
                Ok(Err(error)) => report.failures.push(PartyFailure {
                    party,
                    reason: error.to_string(),
                }),
                Err(join_error) => report.failures.push(PartyFailure {
                    party,
                    reason: join_error.to_string(),
                }),
            }
        }
        report
    }
}
