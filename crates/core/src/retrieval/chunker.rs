//! Corpus sectioning and chunking.
//!
//! The corpus file is a concatenation of scraped pages ("sections") separated
//! by a delimiter line. Each section carries a small recognized header
//! (`SOURCE:` and `TITLE:` lines) followed by prose, which is split into
//! overlapping chunks for embedding.

use serde::{Deserialize, Serialize};

/// Line that separates sections in the consolidated corpus file.
pub fn section_delimiter() -> String {
    "=".repeat(100)
}

/// Target chunk length in characters.
pub const CHUNK_SIZE: usize = 500;
/// Characters of overlap taken from the end of the previous emitted chunk.
pub const CHUNK_OVERLAP: usize = 100;

/// Sections shorter than this (trimmed) are noise and are skipped.
const MIN_SECTION_LEN: usize = 50;
/// How far back from the hard boundary we look for a natural break.
const BREAK_WINDOW: usize = 100;
/// Break points tried in preference order.
const BREAKS: [&str; 4] = [". ", "? ", "! ", "\n\n"];

/// One scraped page of the corpus.
#[derive(Debug, Clone)]
pub struct Section {
    pub source: String,
    pub title: String,
    pub body: String,
    pub ordinal: usize,
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub title: String,
    pub section: usize,
    pub chunk: usize,
}

/// An embeddable piece of a section.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Splits the corpus into sections and extracts their headers.
pub fn split_sections(corpus: &str) -> Vec<Section> {
    let delimiter = section_delimiter();
    let mut sections = Vec::new();
    for (ordinal, raw) in corpus.split(delimiter.as_str()).enumerate() {
        let trimmed = raw.trim();
        if trimmed.len() < MIN_SECTION_LEN {
            continue;
        }
        let mut source = String::new();
        let mut title = String::new();
        for line in trimmed.lines().take(5) {
            if let Some(rest) = line.strip_prefix("SOURCE:") {
                source = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("TITLE:") {
                title = rest.trim().to_string();
            }
        }
        let body = trimmed
            .lines()
            .filter(|l| !l.starts_with("SOURCE:") && !l.starts_with("TITLE:"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        if body.is_empty() {
            continue;
        }
        sections.push(Section {
            source,
            title,
            body,
            ordinal,
        });
    }
    sections
}

/// Splits `text` into chunks of at most `chunk_size` characters, preferring
/// to end a chunk at a sentence or paragraph break found within the final
/// `BREAK_WINDOW` characters. Successive chunks overlap by `overlap`
/// characters, measured from the end of the previously emitted chunk.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(overlap < chunk_size, "overlap must be smaller than chunk size");
    let chars: Vec<char> = text.chars().collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if chars.len() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let mut end = start + chunk_size;
        if end < chars.len() {
            // Scan the tail window for the first break kind that appears,
            // taking its last occurrence within the window.
            let window_start = start.max(end.saturating_sub(BREAK_WINDOW));
            let window: String = chars[window_start..end].iter().collect();
            for brk in BREAKS {
                if let Some(found) = window.rfind(brk) {
                    let prefix_chars = window[..found + brk.len()].chars().count();
                    end = window_start + prefix_chars;
                    break;
                }
            }
        }
        let slice_end = end.min(chars.len());
        let chunk: String = chars[start..slice_end].iter().collect();
        let chunk = chunk.trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        // The next chunk re-reads the final `overlap` characters. The cursor
        // must always advance, even for degenerate size/overlap combinations.
        let next_start = end.saturating_sub(overlap);
        start = if next_start > start { next_start } else { slice_end };
    }
    chunks
}

/// Runs the whole pipeline over a corpus, producing stably-identified chunks.
/// Ids are assigned in document order, so reindexing an unchanged corpus
/// reproduces the same ids.
pub fn chunk_corpus(corpus: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut next_id = 0usize;
    for section in split_sections(corpus) {
        for (chunk_ordinal, text) in chunk_text(&section.body, CHUNK_SIZE, CHUNK_OVERLAP)
            .into_iter()
            .enumerate()
        {
            chunks.push(Chunk {
                id: format!("chunk_{next_id}"),
                text,
                metadata: ChunkMetadata {
                    source: section.source.clone(),
                    title: section.title.clone(),
                    section: section.ordinal,
                    chunk: chunk_ordinal,
                },
            });
            next_id += 1;
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus_with_sections(bodies: &[(&str, &str, &str)]) -> String {
        let delimiter = section_delimiter();
        bodies
            .iter()
            .map(|(source, title, body)| {
                format!("SOURCE: {source}\nTITLE: {title}\n\n{body}\n")
            })
            .collect::<Vec<_>>()
            .join(&format!("\n{delimiter}\n"))
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("Just one sentence.", CHUNK_SIZE, CHUNK_OVERLAP);
        assert_eq!(chunks, vec!["Just one sentence.".to_string()]);
    }

    #[test]
    fn every_chunk_respects_the_size_limit() {
        let sentence = "The card can be frozen from the app at any time. ";
        let text = sentence.repeat(60);
        let chunks = chunk_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= CHUNK_SIZE,
                "chunk of {} chars exceeds the limit",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn chunks_break_at_sentence_boundaries() {
        let sentence = "Interest accrues daily on the savings pocket. ";
        let text = sentence.repeat(40);
        let chunks = chunk_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.ends_with('.'),
                "expected sentence break, got: ...{}",
                &chunk[chunk.len().saturating_sub(20)..]
            );
        }
    }

    #[test]
    fn adjacent_chunks_share_overlap() {
        // A text with no break characters forces hard boundaries, which makes
        // the overlap exact and observable.
        let text: String = "abcdefghij".repeat(120);
        let chunks = chunk_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count() - CHUNK_OVERLAP)
                .collect();
            assert!(
                pair[1].starts_with(&prev_tail),
                "next chunk must begin with the previous chunk's tail"
            );
        }
    }

    #[test]
    fn sections_are_split_and_headers_extracted() {
        let corpus = corpus_with_sections(&[
            (
                "https://help.example.com/cards/freeze",
                "How to freeze your card",
                "Open the app and tap the card tile. Choose freeze. The change is immediate.",
            ),
            (
                "https://help.example.com/savings",
                "Savings pockets",
                "Savings pockets earn daily interest. You can open up to eight pockets.",
            ),
        ]);
        let sections = split_sections(&corpus);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "How to freeze your card");
        assert_eq!(sections[0].source, "https://help.example.com/cards/freeze");
        assert!(!sections[0].body.contains("SOURCE:"));
        assert!(sections[1].body.starts_with("Savings pockets earn"));
    }

    #[test]
    fn tiny_sections_are_skipped() {
        let delimiter = section_delimiter();
        let corpus = format!("tiny\n{delimiter}\nSOURCE: s\nTITLE: t\n\n{}", "x".repeat(80));
        assert_eq!(split_sections(&corpus).len(), 1);
    }

    #[test]
    fn chunk_ids_are_stable_across_passes() {
        let corpus = corpus_with_sections(&[(
            "https://help.example.com/fees",
            "Fees",
            &"There are no monthly account fees. Card replacement is free once a year. "
                .repeat(20),
        )]);
        let first: Vec<_> = chunk_corpus(&corpus)
            .into_iter()
            .map(|c| (c.id, c.text))
            .collect();
        let second: Vec<_> = chunk_corpus(&corpus)
            .into_iter()
            .map(|c| (c.id, c.text))
            .collect();
        assert_eq!(first, second);
        assert!(first[0].0.starts_with("chunk_"));
    }
}
