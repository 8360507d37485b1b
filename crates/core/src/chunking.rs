use crate::models::ChunkStrategy;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 500,
            overlap_chars: 200,
        }
    }
}

pub fn chunk_text(text: &str, strategy: ChunkStrategy, config: ChunkingConfig) -> Vec<String> {
    match strategy {
        ChunkStrategy::Sentence => chunk_by_sentence(text, config),
        ChunkStrategy::Window => chunk_by_window(text, config),
    }
}

/// Split text into sentences. A boundary is sentence-final `.`, `!` or `?`
/// followed by whitespace and an upper-case letter (covers Ä/Ö/Ü), a
/// paragraph break, or the end of input. Abbreviations followed by a
/// capitalized word will split too; sentence integrity is what matters here.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (offset, current) = chars[i];
        if matches!(current, '.' | '!' | '?') {
            let mut j = i + 1;
            let mut newlines = 0usize;
            while j < chars.len() && chars[j].1.is_whitespace() {
                if chars[j].1 == '\n' {
                    newlines += 1;
                }
                j += 1;
            }

            let end_of_input = j >= chars.len();
            let paragraph_break = newlines >= 2;
            let next_is_upper = !end_of_input && j > i + 1 && chars[j].1.is_uppercase();

            if end_of_input || paragraph_break || next_is_upper {
                let sentence = text[start..offset + current.len_utf8()].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = if end_of_input { text.len() } else { chars[j].0 };
                i = j;
                continue;
            }
        }
        i += 1;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Sentence-safe chunking: greedily pack whole sentences up to
/// `max_chars`, never cutting one. A single sentence longer than
/// `max_chars` is kept whole. With `overlap_chars > 0`, trailing whole
/// sentences of the previous chunk are carried into the next, up to the
/// overlap budget.
pub fn chunk_by_sentence(text: &str, config: ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        // One empty chunk, not zero, so records keep a 1..N chunk mapping.
        return vec![String::new()];
    }

    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return vec![text.trim().to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for sentence in sentences {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len > config.max_chars && !current.is_empty() {
            let closed = current.join(" ");
            let closed_len = closed.chars().count();
            chunks.push(closed);

            if config.overlap_chars > 0 && closed_len > config.overlap_chars {
                let mut carried: Vec<String> = Vec::new();
                let mut carried_len = 0usize;
                for previous in current.iter().rev() {
                    let previous_len = previous.chars().count();
                    if carried_len + previous_len > config.overlap_chars {
                        break;
                    }
                    carried_len += previous_len;
                    carried.insert(0, previous.clone());
                }
                current = carried;
                current_len = carried_len;
            } else {
                current.clear();
                current_len = 0;
            }
        }

        current_len += sentence_len + 1;
        current.push(sentence);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    if chunks.is_empty() {
        vec![text.trim().to_string()]
    } else {
        chunks
    }
}

/// Generic bounded-window chunking with character overlap, for free-form
/// text where sentence boundaries cannot be trusted.
pub fn chunk_by_window(text: &str, config: ChunkingConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![String::new()];
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= config.max_chars {
        return vec![trimmed.to_string()];
    }

    let step = config
        .max_chars
        .saturating_sub(config.overlap_chars)
        .max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + config.max_chars).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEECH: &str = "Die Regierung hat gehandelt. Wir haben das Klimaschutzgesetz novelliert! \
        Ist das genug? Die Opposition bestreitet es.";

    #[test]
    fn sentences_split_on_terminal_punctuation_before_uppercase() {
        let sentences = split_sentences(SPEECH);
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], "Die Regierung hat gehandelt.");
        assert_eq!(sentences[2], "Ist das genug?");
    }

    #[test]
    fn umlaut_capitals_start_sentences() {
        let sentences = split_sentences("Das ist klar. Über die Kosten reden wir später.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], "Über die Kosten reden wir später.");
    }

    #[test]
    fn lowercase_continuation_does_not_split() {
        let sentences = split_sentences("Wir investieren ca. drei Milliarden Euro.");
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn paragraph_break_is_a_boundary() {
        let sentences = split_sentences("Erster Satz.\n\nzweiter absatz beginnt klein.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn rejoined_chunks_reconstruct_the_sentence_sequence() {
        let config = ChunkingConfig {
            max_chars: 60,
            overlap_chars: 0,
        };
        let chunks = chunk_by_sentence(SPEECH, config);
        assert!(chunks.len() > 1);

        let rejoined = chunks.join(" ");
        let expected = split_sentences(SPEECH).join(" ");
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn no_chunk_exceeds_max_unless_a_single_sentence_does() {
        let config = ChunkingConfig {
            max_chars: 60,
            overlap_chars: 0,
        };
        for chunk in chunk_by_sentence(SPEECH, config) {
            let longest_sentence = split_sentences(&chunk)
                .into_iter()
                .map(|s| s.chars().count())
                .max()
                .unwrap_or(0);
            assert!(chunk.chars().count() <= config.max_chars || longest_sentence > config.max_chars);
        }
    }

    #[test]
    fn oversized_sentence_is_kept_whole() {
        let long_sentence = format!("{} endet hier.", "sehr ".repeat(50));
        let config = ChunkingConfig {
            max_chars: 40,
            overlap_chars: 0,
        };
        let chunks = chunk_by_sentence(&long_sentence, config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], long_sentence);
    }

    #[test]
    fn overlap_carries_trailing_sentences_forward() {
        let text = "Das Gesetz ist neu. Die Lage ist ernst. Wir handeln jetzt. Alle stimmen zu.";
        let config = ChunkingConfig {
            max_chars: 45,
            overlap_chars: 25,
        };
        let chunks = chunk_by_sentence(text, config);
        assert_eq!(chunks.len(), 3);
        // Each chunk starts with the sentence that closed the previous one.
        for pair in chunks.windows(2) {
            let first_sentences = split_sentences(&pair[0]);
            let second_sentences = split_sentences(&pair[1]);
            assert_eq!(first_sentences.last(), second_sentences.first());
        }
    }

    #[test]
    fn empty_input_yields_a_single_empty_chunk() {
        let config = ChunkingConfig::default();
        assert_eq!(chunk_by_sentence("", config), vec![String::new()]);
        assert_eq!(chunk_by_sentence("   \n ", config), vec![String::new()]);
        assert_eq!(chunk_by_window("", config), vec![String::new()]);
    }

    #[test]
    fn boundary_free_input_is_one_chunk() {
        let config = ChunkingConfig {
            max_chars: 10,
            overlap_chars: 0,
        };
        let chunks = chunk_by_sentence("kein satzende weit und breit", config);
        assert_eq!(chunks, vec!["kein satzende weit und breit".to_string()]);
    }

    #[test]
    fn window_chunks_respect_size_and_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let config = ChunkingConfig {
            max_chars: 10,
            overlap_chars: 4,
        };
        let chunks = chunk_by_window(text, config);
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ghijklmnop");
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
        assert!(chunks.last().unwrap().ends_with('z'));
    }
}
