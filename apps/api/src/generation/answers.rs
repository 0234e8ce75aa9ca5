//! Answer parsing and output formatting.
//!
//! A batch response may contain multiple numbered answers; parsing recovers
//! them in order with progressively looser patterns and never fails — an
//! unstructured response degrades to one whole-text answer.

use std::sync::LazyLock;

use regex::Regex;

use super::truncate_at_boundary;

/// Primary pattern: `1. Answer:` / `2) Answer:` headers.
static ANSWER_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\s*[.)]\s*Answer\s*:").expect("valid regex"));

/// Fallback pattern: bare numbered headers without the word `Answer`.
static BARE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\s*[.)]\s*").expect("valid regex"));

/// `Qn:` headers of the structured question/answer shape.
static Q_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^Q\d+\s*:").expect("valid regex"));

static ANSWER_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Answer\s*:").expect("valid regex"));

/// Telltale AI-disclosure phrases that break the applicant persona.
const PERSONA_LEAK_MARKERS: [&str; 5] = [
    "As an AI",
    "I am an AI",
    "I don't have a passport",
    "I do not have a passport",
    "As an assistant",
];

pub fn has_persona_leak(text: &str) -> bool {
    PERSONA_LEAK_MARKERS.iter().any(|m| text.contains(m))
}

/// Splits `text` into the segments delimited by `header` matches, returning
/// the content after each header up to the next one.
fn segments_after_headers(text: &str, header: &Regex) -> Vec<String> {
    let matches: Vec<_> = header.find_iter(text).collect();
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = matches.get(i + 1).map_or(text.len(), |next| next.start());
            text[m.end()..end].trim().to_string()
        })
        .collect()
}

/// Parses a model response that may contain multiple numbered answers.
/// The result is capped to `expected_count` when positive.
pub fn parse_numbered_answers(model_output: &str, expected_count: usize) -> Vec<String> {
    if model_output.trim().is_empty() {
        return Vec::new();
    }

    let mut results = segments_after_headers(model_output, &ANSWER_HEADER_RE);

    if results.is_empty() {
        results = segments_after_headers(model_output, &BARE_HEADER_RE)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
    }

    if results.is_empty() {
        results.push(model_output.trim().to_string());
    }

    if expected_count > 0 && results.len() > expected_count {
        results.truncate(expected_count);
    }

    results
}

/// Recovers `(question, answer)` pairs from a `Qn: {question} Answer:
/// {answer}` shaped response. Blocks without an `Answer:` label are skipped.
pub fn parse_labeled_answers(model_output: &str) -> Vec<(String, String)> {
    let matches: Vec<_> = Q_HEADER_RE.find_iter(model_output).collect();
    let mut pairs = Vec::new();

    for (i, m) in matches.iter().enumerate() {
        let end = matches
            .get(i + 1)
            .map_or(model_output.len(), |next| next.start());
        let block = &model_output[m.end()..end];

        if let Some(label) = ANSWER_LABEL_RE.find(block) {
            let question = block[..label.start()].trim().to_string();
            let answer = block[label.end()..].trim().to_string();
            pairs.push((question, answer));
        }
    }

    pairs
}

/// Truncates an answer to the caller's character limit, backing up to the
/// last word boundary and appending an ellipsis marker. Applied uniformly to
/// every answer in a batch, after parsing and guarding.
pub fn format_answer(response: &str, character_limit: Option<usize>) -> String {
    if response.trim().is_empty() {
        return String::new();
    }

    let limit = match character_limit {
        Some(limit) if limit > 0 => limit,
        _ => return response.to_string(),
    };

    if response.len() <= limit {
        return response.to_string();
    }

    let mut trimmed = truncate_at_boundary(response, limit);
    if let Some(last_space) = trimmed.rfind(' ') {
        if last_space > 0 {
            trimmed = &trimmed[..last_space];
        }
    }

    format!("{trimmed}...")
}
