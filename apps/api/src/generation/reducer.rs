//! Context reduction — two tiers of text-size safety nets.
//!
//! Every function here is fail-open: on any internal failure the caller gets
//! either the original text or a hard truncation, never an error. A worse
//! answer beats no answer.

use std::collections::HashSet;

use tracing::{info, warn};

use super::prompts::{
    COMPRESSION_PROMPT, QUESTION_REDUCE_PROMPT_HEADER, QUESTION_REDUCE_PROMPT_RULES,
    QUESTION_REDUCE_PROMPT_SUFFIX, SMART_REDUCE_PROMPT, SMART_REDUCE_PROMPT_SUFFIX,
};
use super::truncate_at_boundary;
use crate::providers::TextGenerator;

/// Above this, the model-assisted summarization tier kicks in.
pub const SMART_REDUCE_THRESHOLD: usize = 8_000;
/// Hard cap on what we feed the summarization call itself, so the
/// compression request can never blow up on its own input.
const SMART_REDUCE_INPUT_CAP: usize = 12_000;

/// Context-cache path: contexts under this are passed through untouched.
pub const CONTEXT_CACHE_THRESHOLD: usize = 5_000;
const CONTEXT_CACHE_FALLBACK_LEN: usize = 4_000;

const QUESTION_REDUCE_INPUT_CAP: usize = 15_000;

const CV_TRIM_LIMIT: usize = 2_000;
const PROJECT_TRIM_LIMIT: usize = 1_500;
const TOPIC_TRIM_LIMIT: usize = 800;

/// Navigational, legal, and social-media boilerplate that never helps a
/// model answer an application question. Matched case-insensitively as
/// substrings against whole lines.
const BOILERPLATE_PHRASES: [&str; 14] = [
    "copyright",
    "instagram",
    "facebook",
    "tiktok",
    "linkedin",
    "search for",
    "anasayfa",
    "hakkımızda",
    "iletişim",
    "blog",
    "info pack",
    "google forms",
    "ai platform",
    "blacklist",
];

/// Whether a line is navigation/legal/footer noise.
pub fn is_boilerplate_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    if BOILERPLATE_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    if line.starts_with('©') || lower.contains("all rights reserved") {
        return true;
    }
    // Agency sites love to paste "generative AI prohibited" warnings into forms.
    lower.contains("generative ai") && lower.contains("warning")
}

/// Heuristic tier: drops duplicate lines, over-long lines, and boilerplate.
/// Deterministic and idempotent — re-running on cleaned text is a no-op.
pub fn clean_lines(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.len() > 300 {
            continue;
        }
        if !seen.insert(trimmed.to_lowercase()) {
            continue;
        }
        if is_boilerplate_line(trimmed) {
            continue;
        }
        kept.push(trimmed);
    }

    kept.join("\n")
}

/// The heuristic tier's public contract: identity below `max_safe`,
/// line-level cleanup above it.
pub fn heuristic_reduce(text: &str, max_safe: usize) -> String {
    if text.len() <= max_safe {
        return text.to_string();
    }
    clean_lines(text)
}

/// Model-assisted tier: summarizes oversized content through the gateway.
/// Falls back to the original text on any failure or empty result.
pub async fn smart_reduce(llm: &dyn TextGenerator, content: &str) -> String {
    if content.trim().is_empty() || content.len() <= SMART_REDUCE_THRESHOLD {
        return content.to_string();
    }

    info!(
        "content length {} exceeds safe limit, auto-summarizing",
        content.len()
    );

    let slice = truncate_at_boundary(content, SMART_REDUCE_INPUT_CAP);
    let prompt = format!("{SMART_REDUCE_PROMPT}{slice}{SMART_REDUCE_PROMPT_SUFFIX}");

    match llm.generate(&prompt, None).await {
        Ok(summary) if !summary.trim().is_empty() => {
            info!("reduced {} -> {} chars", content.len(), summary.len());
            summary
        }
        Ok(_) => content.to_string(),
        Err(e) => {
            warn!("summarization failed: {e}; using original content");
            content.to_string()
        }
    }
}

/// Context-cache path: compresses a large context once so later questions
/// reuse the small version. Falls back to hard truncation with a marker, so
/// the caller never receives an over-length payload and never sees an error.
pub async fn reduce_if_necessary(llm: &dyn TextGenerator, full_context: &str) -> String {
    if full_context.trim().is_empty() || full_context.len() < CONTEXT_CACHE_THRESHOLD {
        return full_context.to_string();
    }

    let safe_input = if full_context.len() > SMART_REDUCE_INPUT_CAP {
        format!(
            "{}\n...(truncated)...",
            truncate_at_boundary(full_context, SMART_REDUCE_INPUT_CAP)
        )
    } else {
        full_context.to_string()
    };
    let prompt = format!("{COMPRESSION_PROMPT}{safe_input}");

    match llm.generate(&prompt, None).await {
        Ok(summary) if !summary.trim().is_empty() => summary,
        _ => format!(
            "{}\n...(content auto-reduced due to size limit)...",
            truncate_at_boundary(full_context, CONTEXT_CACHE_FALLBACK_LEN)
        ),
    }
}

/// Per-question tier: keeps only the context relevant to one question, so
/// each question in a batch gets an individually right-sized window.
pub async fn reduce_for_question(
    llm: &dyn TextGenerator,
    full_context: &str,
    question: &str,
) -> String {
    if full_context.trim().is_empty() {
        return String::new();
    }

    info!("trimming context for question: {question}");

    let slice = truncate_at_boundary(full_context, QUESTION_REDUCE_INPUT_CAP);
    let prompt = format!(
        "{QUESTION_REDUCE_PROMPT_HEADER}{question}\n{QUESTION_REDUCE_PROMPT_RULES}{slice}{QUESTION_REDUCE_PROMPT_SUFFIX}"
    );

    match llm.generate(&prompt, None).await {
        Ok(reduced) if !reduced.trim().is_empty() => {
            info!(
                "reduced question context {} -> {} chars",
                full_context.len(),
                reduced.len()
            );
            reduced
        }
        Ok(_) => {
            warn!("question reduction returned empty, using original");
            full_context.to_string()
        }
        Err(e) => {
            warn!("question reduction failed: {e}; using original");
            full_context.to_string()
        }
    }
}

/// Trimmer helper: caps the CV section.
pub fn trim_cv(cv: &str) -> String {
    if cv.trim().is_empty() {
        return String::new();
    }
    if cv.len() > CV_TRIM_LIMIT {
        format!(
            "{}\n[...Truncated CV...]",
            truncate_at_boundary(cv, CV_TRIM_LIMIT)
        )
    } else {
        cv.to_string()
    }
}

/// Trimmer helper: cleans and caps the project/application section.
pub fn trim_project(project: &str) -> String {
    let cleaned = clean_lines(project);
    if cleaned.len() > PROJECT_TRIM_LIMIT {
        format!(
            "{}\n[...Truncated Project...]",
            truncate_at_boundary(&cleaned, PROJECT_TRIM_LIMIT)
        )
    } else {
        cleaned
    }
}

/// Trimmer helper: caps the program topic.
pub fn trim_topic(topic: &str) -> String {
    if topic.len() > TOPIC_TRIM_LIMIT {
        format!("{}...", truncate_at_boundary(topic, TOPIC_TRIM_LIMIT))
    } else {
        topic.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedGenerator;

    #[test]
    fn test_heuristic_reduce_is_identity_below_threshold() {
        let text = "short text\nshort text\ncopyright 2024";
        assert_eq!(heuristic_reduce(text, 8_000), text);
    }

    #[test]
    fn test_heuristic_reduce_is_idempotent_above_threshold() {
        let mut text = String::new();
        for i in 0..400 {
            text.push_str(&format!("Line number {} with some filler words\n", i % 150));
        }
        text.push_str("Follow us on Instagram\n© 2024 Some Agency. All rights reserved.\n");
        assert!(text.len() > 8_000);

        let once = heuristic_reduce(&text, 8_000);
        let twice = heuristic_reduce(&once, 0);
        assert_eq!(once, twice);
        assert!(once.len() < text.len());
    }

    #[test]
    fn test_clean_lines_removes_duplicates_case_insensitively() {
        let text = "My project experience\nMY PROJECT EXPERIENCE\nSomething else";
        let cleaned = clean_lines(text);
        assert_eq!(cleaned, "My project experience\nSomething else");
    }

    #[test]
    fn test_clean_lines_drops_boilerplate_and_long_lines() {
        let long_line = "x".repeat(301);
        let text = format!(
            "Keep this line\nFollow us on instagram\n© 2024 Agency\n{long_line}\nAlso keep this"
        );
        assert_eq!(clean_lines(&text), "Keep this line\nAlso keep this");
    }

    #[test]
    fn test_boilerplate_predicate() {
        assert!(is_boilerplate_line("Find us on LinkedIn and Facebook"));
        assert!(is_boilerplate_line("© 2023 Agency"));
        assert!(is_boilerplate_line("All Rights Reserved"));
        assert!(is_boilerplate_line(
            "Warning: generative AI use is prohibited"
        ));
        assert!(!is_boilerplate_line("I studied computer science"));
    }

    #[tokio::test]
    async fn test_smart_reduce_passes_short_input_through() {
        let llm = ScriptedGenerator::new(vec![]);
        let text = "a short CV";
        assert_eq!(smart_reduce(&llm, text).await, text);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_smart_reduce_uses_summary_and_caps_input() {
        let llm = ScriptedGenerator::new(vec![Ok("condensed")]);
        let text = "long line of context text\n".repeat(1_000);
        let reduced = smart_reduce(&llm, &text).await;
        assert_eq!(reduced, "condensed");

        let (prompt, _) = llm.calls().into_iter().next().unwrap();
        // instruction + capped slice + suffix, never the whole input
        assert!(prompt.len() < 13_000);
    }

    #[tokio::test]
    async fn test_smart_reduce_falls_back_to_original_on_failure() {
        let llm = ScriptedGenerator::new(vec![Err("boom")]);
        let text = "context\n".repeat(2_000);
        assert_eq!(smart_reduce(&llm, &text).await, text);
    }

    #[tokio::test]
    async fn test_smart_reduce_falls_back_to_original_on_empty_summary() {
        let llm = ScriptedGenerator::new(vec![Ok("   ")]);
        let text = "context\n".repeat(2_000);
        assert_eq!(smart_reduce(&llm, &text).await, text);
    }

    #[tokio::test]
    async fn test_reduce_if_necessary_truncates_on_failure() {
        let llm = ScriptedGenerator::new(vec![Err("down")]);
        let text = "c".repeat(6_000);
        let reduced = reduce_if_necessary(&llm, &text).await;
        assert!(reduced.len() < text.len());
        assert!(reduced.ends_with("...(content auto-reduced due to size limit)..."));
    }

    #[tokio::test]
    async fn test_reduce_for_question_keeps_original_on_empty_result() {
        let llm = ScriptedGenerator::new(vec![Ok("")]);
        let context = "full context here";
        let reduced = reduce_for_question(&llm, context, "Why do you apply?").await;
        assert_eq!(reduced, context);
    }

    #[tokio::test]
    async fn test_reduce_for_question_embeds_the_question() {
        let llm = ScriptedGenerator::new(vec![Ok("relevant part")]);
        let reduced = reduce_for_question(&llm, "big context", "Why do you apply?").await;
        assert_eq!(reduced, "relevant part");
        let (prompt, _) = llm.calls().into_iter().next().unwrap();
        assert!(prompt.contains("Why do you apply?"));
        assert!(prompt.contains("big context"));
    }

    #[test]
    fn test_trim_cv_appends_marker_only_when_over_limit() {
        assert_eq!(trim_cv("short cv"), "short cv");
        let long = "c".repeat(2_500);
        let trimmed = trim_cv(&long);
        assert!(trimmed.ends_with("[...Truncated CV...]"));
        assert!(trimmed.len() < long.len());
    }

    #[test]
    fn test_trim_project_cleans_then_caps() {
        let long = format!("Follow us on instagram\n{}", "p".repeat(2_000));
        let trimmed = trim_project(&long);
        assert!(!trimmed.contains("instagram"));
        assert!(trimmed.ends_with("[...Truncated Project...]"));
    }

    #[test]
    fn test_trim_topic() {
        assert_eq!(trim_topic("AI and society"), "AI and society");
        let long = "t".repeat(900);
        let trimmed = trim_topic(&long);
        assert!(trimmed.ends_with("..."));
        assert!(trimmed.len() <= 803);
    }
}
