//! Question extraction — derives the discrete questions to answer from
//! free-form source text.
//!
//! Layered heuristics, in priority order: `?`-terminated lines with a
//! minimum word count, known form-field labels rewritten into natural
//! questions, field-looking lines, numbered-list items. A model-assisted
//! variant handles noisy input. Each rule is a named predicate so it can be
//! tested in isolation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use super::prompts::{EXTRACTION_ADVANCED_PROMPT, EXTRACTION_STRICT_PROMPT};
use super::reducer::heuristic_reduce;
use crate::providers::{ProviderError, TextGenerator};

const MAX_QUESTION_LINE_LEN: usize = 250;
const MIN_QUESTION_WORDS: usize = 5;
const MIN_NUMBERED_ITEM_LEN: usize = 30;
const MIN_LLM_QUESTION_LEN: usize = 5;

/// Source text above this is cleaned heuristically before the extraction
/// call, so the extraction request itself stays bounded.
const EXTRACTION_SOURCE_CAP: usize = 10_000;

/// Leading list markers on source lines: `1.`, `2)`, `-`, `*`, `•`.
static LIST_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+\s*[.)]|[-*•]+)\s+").expect("valid regex"));

/// Leading markers on model-returned question lines: `1.`, `Q1:`, `- `.
static REPLY_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+\s*[.)]\s*|Q\d+\s*[:.]\s*|-\s+)").expect("valid regex"));

/// Line-level denylist tuned for question detection (navigation, legal,
/// social-media, and form-spam phrases).
const QUESTION_DENYLIST: [&str; 15] = [
    "copyright",
    "instagram",
    "facebook",
    "tiktok",
    "linkedin",
    "search for",
    "anasayfa",
    "hakkımızda",
    "iletişim",
    "info pack",
    "click the link",
    "ai prohibited",
    "please read carefully",
    "google forms",
    "navigation",
];

/// Form-field labels that are not phrased as questions but demand input.
/// Matched after stripping trailing `*` / `:` decorations.
const FIELD_LABELS: [(&str, &str); 8] = [
    ("name and surname", "What is your name and surname?"),
    ("email address", "What is your email address?"),
    ("phone number", "What is your phone number?"),
    ("date of birth", "What is your date of birth?"),
    ("gender", "What is your gender?"),
    ("city", "What city do you live in?"),
    ("passport type", "What is your passport type?"),
    ("level of english", "What is your level of English?"),
];

pub fn is_denylisted(line: &str) -> bool {
    let lower = line.to_lowercase();
    QUESTION_DENYLIST.iter().any(|p| lower.contains(p))
}

/// CV body text masquerading as form lines.
pub fn is_cv_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("work experience")
        || lower.contains("education and training")
        || lower.starts_with("passport:")
        || lower.starts_with("phone:")
}

pub fn strip_list_prefix(line: &str) -> &str {
    match LIST_PREFIX_RE.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

pub fn word_count(line: &str) -> usize {
    line.split_whitespace().count()
}

/// Case-folded, whitespace-collapsed dedup key.
pub fn normalize_key(line: &str) -> String {
    line.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrites a known form-field label into a natural question.
pub fn label_to_question(line: &str) -> Option<&'static str> {
    let stripped = line
        .trim()
        .trim_end_matches(['*', ':', ' '])
        .to_lowercase();
    FIELD_LABELS
        .iter()
        .find(|(label, _)| *label == stripped)
        .map(|(_, question)| *question)
}

fn looks_like_form_field(line: &str) -> bool {
    line.contains('*') || line.contains(':')
}

/// Extracts an ordered, duplicate-free set of questions from raw text.
pub fn extract_clean_questions(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut seen: HashSet<String> = HashSet::new();
    let mut results: Vec<String> = Vec::new();

    for line in normalized.lines() {
        let had_number = LIST_PREFIX_RE
            .find(line)
            .is_some_and(|m| m.as_str().trim_start().starts_with(|c: char| c.is_ascii_digit()));
        let stripped = strip_list_prefix(line);

        if stripped.is_empty() || stripped.len() > MAX_QUESTION_LINE_LEN {
            continue;
        }
        if is_denylisted(stripped) || is_cv_header(stripped) {
            continue;
        }

        let candidate = if stripped.ends_with('?') && word_count(stripped) >= MIN_QUESTION_WORDS {
            stripped.to_string()
        } else if let Some(question) = label_to_question(stripped) {
            question.to_string()
        } else if looks_like_form_field(stripped) && word_count(stripped) >= MIN_QUESTION_WORDS {
            stripped.to_string()
        } else if had_number && stripped.len() >= MIN_NUMBERED_ITEM_LEN {
            stripped.to_string()
        } else {
            continue;
        };

        if seen.insert(normalize_key(&candidate)) {
            results.push(candidate);
        }
    }

    results
}

/// Extraction instruction flavors for the model-assisted variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Strict,
    AdvancedForm,
    Default,
}

impl ExtractionMode {
    /// Strict question-only mode wins over the advanced form mode.
    pub fn from_flags(use_question_mode: bool, use_advanced_form_mode: bool) -> Self {
        if use_question_mode {
            Self::Strict
        } else if use_advanced_form_mode {
            Self::AdvancedForm
        } else {
            Self::Default
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            // Default shares the strict instruction: without an explicit
            // advanced opt-in, only unambiguous questions survive.
            Self::Strict | Self::Default => EXTRACTION_STRICT_PROMPT,
            Self::AdvancedForm => EXTRACTION_ADVANCED_PROMPT,
        }
    }
}

/// Re-parses a model's numbered question list into clean question strings.
pub fn parse_listed_questions(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| REPLY_PREFIX_RE.replace(line.trim(), "").trim().to_string())
        .filter(|q| q.len() > MIN_LLM_QUESTION_LEN)
        .collect()
}

/// Model-assisted extraction for noisy input. Oversized sources are shrunk
/// heuristically first; provider failures propagate (the request cannot
/// proceed without a backend), but an empty extraction degrades to an empty
/// set.
pub async fn extract_questions_llm(
    llm: &dyn TextGenerator,
    source: &str,
    mode: ExtractionMode,
    model_override: Option<&str>,
) -> Result<Vec<String>, ProviderError> {
    let source = heuristic_reduce(source, EXTRACTION_SOURCE_CAP);
    let prompt = format!("{}{}", mode.instruction(), source);

    let response = llm.generate(&prompt, model_override).await?;
    let questions = parse_listed_questions(&response);
    info!("extracted {} questions", questions.len());
    Ok(questions)
}
