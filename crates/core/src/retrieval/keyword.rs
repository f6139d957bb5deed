//! Keyword-scoring fallback search.
//!
//! Used whenever the vector store is disabled, unpopulated, or the embedding
//! service fails at query time. Scores whole sections rather than chunks and
//! favors concise sections that mention every query keyword.

use super::chunker::{split_sections, Section};

/// Closed stop set, matched case-insensitively after tokenization.
const STOP_WORDS: &[&str] = &[
    "are", "the", "is", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
    "with", "from", "my", "your", "i", "you", "it", "this", "that", "be", "can", "do", "does",
    "what", "how", "when", "where", "why", "which",
];

/// Sections shorter than this are too thin to rank.
const MIN_SECTION_LEN: usize = 100;
/// At most this many characters of a section are returned as a snippet.
const SNIPPET_LEN: usize = 600;
/// Lines of the section body considered for the snippet.
const SNIPPET_LINES: usize = 10;

/// Lowercases the query and keeps alphabetic words of three or more
/// characters that are not stop words.
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Scores one section against the keywords. Returns `None` when nothing
/// matches or the section is too short to rank.
fn score_section(section: &Section, keywords: &[String]) -> Option<f64> {
    let body_lower = section.body.to_lowercase();
    let section_len = section.body.trim().len();
    if section_len < MIN_SECTION_LEN {
        return None;
    }
    let matched = keywords.iter().filter(|kw| body_lower.contains(*kw)).count();
    if matched == 0 {
        return None;
    }
    let mut score = matched as f64 * 100.0;
    if matched == keywords.len() {
        score += 200.0;
    }
    Some(score / (section_len as f64 / 100.0))
}

fn snippet(section: &Section) -> String {
    let joined = section
        .body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('='))
        .take(SNIPPET_LINES)
        .collect::<Vec<_>>()
        .join(" ");
    joined.chars().take(SNIPPET_LEN).collect()
}

/// Searches the corpus by keyword score and formats the top `k` sections the
/// same way the semantic path does. Returns `None` when no section matches.
pub fn keyword_search(corpus: &str, query: &str, k: usize) -> Option<String> {
    let keywords = extract_keywords(query);
    if keywords.is_empty() {
        return None;
    }

    let sections = split_sections(corpus);
    let mut scored: Vec<(f64, &Section)> = sections
        .iter()
        .filter_map(|s| score_section(s, &keywords).map(|score| (score, s)))
        .collect();
    if scored.is_empty() {
        return None;
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut results: Vec<String> = Vec::new();
    for (_, section) in scored {
        let text = snippet(section);
        let formatted = if section.title.is_empty() {
            text.clone()
        } else {
            format!("[{}]\n{}", section.title, text)
        };
        if results.contains(&formatted) {
            continue;
        }
        results.push(formatted);
        if results.len() >= k {
            break;
        }
    }
    Some(results.join("\n\n---\n\n"))
}
