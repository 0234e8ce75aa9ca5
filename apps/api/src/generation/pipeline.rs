//! Generation pipeline — orchestrates the full request flow.
//!
//! Flow: trimmer rewrites → model normalization → question extraction →
//!       context reduction → prompt assembly → dispatch → answer parsing →
//!       persona guard → output formatting.
//!
//! Batch processing is a deliberate sequential loop: each question's
//! reduction and generation complete before the next begins, which keeps
//! per-question logging deterministic at the cost of linear latency.

use tracing::{info, warn};

use super::answers::{
    format_answer, has_persona_leak, parse_labeled_answers, parse_numbered_answers,
};
use super::prompt_builder::{build_batch_prompt, build_prompt};
use super::prompts::PERSONA_RECOVERY_PREFIX;
use super::questions::{extract_clean_questions, extract_questions_llm, ExtractionMode};
use super::reducer::{reduce_for_question, reduce_if_necessary, smart_reduce, trim_cv, trim_project};
use crate::models::generation::{AnswerRecord, DebugInfo, GenerationRequest, TrimmedContext};
use crate::providers::{ProviderError, ProviderId, TextGenerator};
use crate::settings::ProviderSettings;

/// Globally retired model identifier; rewritten before anything touches it.
const RETIRED_MODEL_ALIAS: &str = "llama3-8b-8192";
const RETIRED_MODEL_REPLACEMENT: &str = "llama-3.1-8b-instant";

/// Everything the boundary needs to build the success response.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub answers: Vec<AnswerRecord>,
    pub trimmed_cv: Option<String>,
    pub trimmed_project: Option<String>,
    pub trimmed_form: Option<String>,
    pub debug: Option<DebugInfo>,
}

/// Generation entry point shared by every stage that dispatches a prompt:
/// oversized prompts pass through the model-assisted reducer first. The chat
/// and connectivity-test endpoints call this directly.
pub async fn generate_text(
    llm: &dyn TextGenerator,
    prompt: &str,
    model_override: Option<&str>,
) -> Result<String, ProviderError> {
    let prompt = smart_reduce(llm, prompt).await;
    llm.generate(&prompt, model_override).await
}

/// Context-cache variant: compresses the context once, then answers against
/// the compressed version.
async fn generate_with_context(
    llm: &dyn TextGenerator,
    full_context: &str,
    question: &str,
    model_override: Option<&str>,
) -> Result<String, ProviderError> {
    let context = smart_reduce(llm, full_context).await;
    let effective = reduce_if_necessary(llm, &context).await;
    let prompt = format!("{effective}\n\nQUESTION:\n{question}\n\nANSWER:");
    llm.generate(&prompt, model_override).await
}

/// Runs one full pipeline invocation.
pub async fn run_generation(
    llm: &dyn TextGenerator,
    settings: &ProviderSettings,
    mut request: GenerationRequest,
) -> Result<PipelineOutcome, ProviderError> {
    // Trimmer field rewrites happen before anything else; the echoes go back
    // to the caller so the UI can show what was actually used.
    let mut trimmed_cv = None;
    let mut trimmed_project = None;
    let mut trimmed_form = None;

    if request.enable_text_trimmer {
        if !request.cv_content.is_empty() {
            request.cv_content = trim_cv(&request.cv_content);
            trimmed_cv = Some(request.cv_content.clone());
        }
        if !request.application_content.is_empty() {
            request.application_content = trim_project(&request.application_content);
            trimmed_project = Some(request.application_content.clone());
        }
        let clean_questions = extract_clean_questions(&request.question);
        if !clean_questions.is_empty() {
            trimmed_form = Some(clean_questions.join("\n\n"));
            // A single question buried in junk replaces the raw field.
            if clean_questions.len() == 1 {
                request.question = clean_questions[0].clone();
            }
        }
    }

    normalize_requested_model(settings, &mut request);

    // Question set: model-assisted extraction for the extraction modes over
    // application content, heuristics over the question field otherwise.
    let questions = if (request.use_question_mode || request.use_advanced_form_mode)
        && !request.application_content.trim().is_empty()
    {
        let mode =
            ExtractionMode::from_flags(request.use_question_mode, request.use_advanced_form_mode);
        info!("agentic extraction started (mode {mode:?})");
        extract_questions_llm(
            llm,
            &request.application_content,
            mode,
            request.model_override(),
        )
        .await?
    } else {
        extract_clean_questions(&request.question)
    };

    let use_batch =
        questions.len() >= 2 || (request.use_question_mode && !questions.is_empty());

    let (answers, debug) = if use_batch && !request.is_motivation_letter {
        info!("processing {} questions", questions.len());
        if request.enable_text_trimmer {
            let source_content = trimmed_project
                .clone()
                .unwrap_or_else(|| request.application_content.clone());
            per_question_generation(llm, &request, &questions, &source_content).await?
        } else {
            batch_generation(llm, &request, &questions).await?
        }
    } else {
        single_generation(llm, &request).await?
    };

    Ok(PipelineOutcome {
        answers,
        trimmed_cv,
        trimmed_project,
        trimmed_form,
        debug,
    })
}

/// Rewrites retired aliases in the request override and persists the
/// last-used model for the active backend.
fn normalize_requested_model(settings: &ProviderSettings, request: &mut GenerationRequest) {
    if request.model_name.trim() == RETIRED_MODEL_ALIAS {
        request.model_name = RETIRED_MODEL_REPLACEMENT.to_string();
    }

    if let Some(model) = request.model_override() {
        if let Some(provider) = ProviderId::parse(&settings.current_provider()) {
            // set_model canonicalizes backend-specific aliases on its own.
            settings.set_model(provider, model);
        }
    }
}

/// Trimmer batch mode: every question gets an individually reduced context
/// window and its own generation call, strictly in order.
async fn per_question_generation(
    llm: &dyn TextGenerator,
    request: &GenerationRequest,
    questions: &[String],
    source_content: &str,
) -> Result<(Vec<AnswerRecord>, Option<DebugInfo>), ProviderError> {
    info!("trimmer enabled, generating per-question answers with reduced context");

    let base_context = format!(
        "CV:\n{}\n\nPROJECT INFO:\n{}\n\nNOTES:\n{}",
        request.cv_content, source_content, request.additional_notes
    );

    let mut answers = Vec::with_capacity(questions.len());
    let mut contexts = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        let specific_context = reduce_for_question(llm, &base_context, question).await;

        let single_request = GenerationRequest {
            cv_content: request.cv_content.clone(),
            application_content: specific_context.clone(),
            application_type: request.application_type.clone(),
            program_topic: request.program_topic.clone(),
            question: question.clone(),
            language_level: request.language_level.clone(),
            character_limit: request.character_limit,
            model_name: request.model_name.clone(),
            // Notes already live inside the reduced context.
            ..Default::default()
        };

        let prompt = build_prompt(&single_request);
        let response = generate_text(llm, &prompt, request.model_override()).await?;

        answers.push(AnswerRecord {
            question: question.clone(),
            answer: format_answer(&response, request.character_limit),
        });
        contexts.push(TrimmedContext {
            index,
            question: question.clone(),
            trimmed_context: specific_context,
        });
    }

    Ok((
        answers,
        Some(DebugInfo {
            trimmed_contexts: contexts,
        }),
    ))
}

/// Default batch mode: one prompt over all questions, one call, answers
/// recovered from the numbered response.
async fn batch_generation(
    llm: &dyn TextGenerator,
    request: &GenerationRequest,
    questions: &[String],
) -> Result<(Vec<AnswerRecord>, Option<DebugInfo>), ProviderError> {
    info!("using single batch call");

    let batch_prompt = build_batch_prompt(request, questions);
    let response = generate_text(llm, &batch_prompt, request.model_override()).await?;
    let parsed = parse_numbered_answers(&response, questions.len());

    let answers = questions
        .iter()
        .enumerate()
        .map(|(i, question)| AnswerRecord {
            question: question.clone(),
            answer: format_answer(
                parsed.get(i).map(String::as_str).unwrap_or_default(),
                request.character_limit,
            ),
        })
        .collect();

    Ok((answers, None))
}

/// Single-answer path, with the one-shot persona-leak regeneration. The
/// second response is used unconditionally — no rescan, no further retries.
async fn single_generation(
    llm: &dyn TextGenerator,
    request: &GenerationRequest,
) -> Result<(Vec<AnswerRecord>, Option<DebugInfo>), ProviderError> {
    let prompt = build_prompt(request);

    let mut response = if request.use_context_cache {
        generate_with_context(llm, &prompt, "", request.model_override()).await?
    } else {
        generate_text(llm, &prompt, request.model_override()).await?
    };

    if has_persona_leak(&response) {
        warn!("meta response detected, regenerating with strict persona");
        let recovery_prompt = format!("{PERSONA_RECOVERY_PREFIX}{prompt}");
        response = generate_text(llm, &recovery_prompt, request.model_override()).await?;
    }

    let limit = request.character_limit;
    let mut answers = Vec::new();

    if request.use_question_mode && !request.is_motivation_letter {
        let parsed = parse_numbered_answers(&response, 0);
        if parsed.is_empty() {
            answers.push(AnswerRecord {
                question: request.question.clone(),
                answer: format_answer(&response, limit),
            });
        } else {
            let pairs = parse_labeled_answers(&response);
            if pairs.is_empty() {
                for (i, answer) in parsed.iter().enumerate() {
                    answers.push(AnswerRecord {
                        question: format!("Question {}", i + 1),
                        answer: format_answer(answer, limit),
                    });
                }
            } else {
                for (question, answer) in pairs {
                    answers.push(AnswerRecord {
                        question,
                        answer: format_answer(&answer, limit),
                    });
                }
            }
        }
    } else {
        answers.push(AnswerRecord {
            question: request.question.clone(),
            answer: format_answer(&response, limit),
        });
    }

    let debug = request.enable_text_trimmer.then(|| DebugInfo {
        trimmed_contexts: answers
            .iter()
            .enumerate()
            .map(|(index, _)| TrimmedContext {
                index,
                question: "Global Context".to_string(),
                trimmed_context: prompt.clone(),
            })
            .collect(),
    });

    Ok((answers, debug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedGenerator;

    fn request_with(f: impl FnOnce(&mut GenerationRequest)) -> GenerationRequest {
        let mut request = GenerationRequest {
            cv_content: "Biology student, English B1, volunteer at the local shelter.".to_string(),
            ..Default::default()
        };
        f(&mut request);
        request
    }

    fn settings() -> ProviderSettings {
        ProviderSettings::new("ollama")
    }

    #[tokio::test]
    async fn test_single_question_yields_one_answer() {
        let llm = ScriptedGenerator::new(vec![Ok("I would love to join.")]);
        let request = request_with(|r| r.question = "Why do you apply?".to_string());
        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(outcome.answers.len(), 1);
        assert_eq!(outcome.answers[0].question, "Why do you apply?");
        assert_eq!(outcome.answers[0].answer, "I would love to join.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_question_mode_answers_each_extracted_question_in_order() {
        // Extraction call, then one batch call.
        let llm = ScriptedGenerator::new(vec![
            Ok("1. Why do you want to join this program?\n2. What skills do you bring to the team?\n3. How will you share what you learned?"),
            Ok("1. Answer: Because I care.\n2. Answer: Organization and patience.\n3. Answer: Workshops at my university."),
        ]);
        let request = request_with(|r| {
            r.use_question_mode = true;
            r.application_content =
                "Why do you want to join this program?\nWhat skills do you bring to the team?\nHow will you share what you learned?".to_string();
        });

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(outcome.answers.len(), 3);
        assert_eq!(
            outcome.answers[0].question,
            "Why do you want to join this program?"
        );
        assert_eq!(outcome.answers[0].answer, "Because I care.");
        assert_eq!(outcome.answers[2].answer, "Workshops at my university.");
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_persona_leak_triggers_exactly_one_regeneration() {
        // The second response still leaks; it must be used anyway.
        let llm = ScriptedGenerator::new(vec![
            Ok("As an AI, I cannot apply."),
            Ok("As an AI, here is my second try."),
        ]);
        let request = request_with(|r| r.question = "Do you have a passport?".to_string());

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(outcome.answers[0].answer, "As an AI, here is my second try.");
        assert_eq!(llm.call_count(), 2);

        let calls = llm.calls();
        assert!(calls[1].0.starts_with(PERSONA_RECOVERY_PREFIX));
    }

    #[tokio::test]
    async fn test_clean_response_skips_regeneration() {
        let llm = ScriptedGenerator::new(vec![Ok("Yes, I have a valid passport.")]);
        let request = request_with(|r| r.question = "Do you have a passport?".to_string());
        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(llm.call_count(), 1);
        assert_eq!(outcome.answers[0].answer, "Yes, I have a valid passport.");
    }

    #[tokio::test]
    async fn test_batch_mode_without_question_mode_needs_two_questions() {
        let llm = ScriptedGenerator::new(vec![
            Ok("1. Answer: First.\n2. Answer: Second."),
        ]);
        let request = request_with(|r| {
            r.question =
                "Why do you want to join this exchange?\nWhat do you expect to learn there?"
                    .to_string();
        });

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(outcome.answers.len(), 2);
        assert_eq!(
            outcome.answers[0].question,
            "Why do you want to join this exchange?"
        );
        assert_eq!(outcome.answers[1].answer, "Second.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_motivation_letter_never_batches() {
        let llm = ScriptedGenerator::new(vec![Ok("Dear committee, I am writing to apply.")]);
        let request = request_with(|r| {
            r.is_motivation_letter = true;
            r.question =
                "Why do you want to join this exchange?\nWhat do you expect to learn there?"
                    .to_string();
        });

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(outcome.answers.len(), 1);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_trimmer_batch_reduces_context_per_question() {
        // Two questions: (reduce, generate) x 2, strictly interleaved.
        let llm = ScriptedGenerator::new(vec![
            Ok("reduced context one"),
            Ok("First answer."),
            Ok("reduced context two"),
            Ok("Second answer."),
        ]);
        let request = request_with(|r| {
            r.enable_text_trimmer = true;
            r.question =
                "Why do you want to join this exchange?\nWhat do you expect to learn there?"
                    .to_string();
            r.application_content = "A project about community gardening in rural areas".to_string();
        });

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(outcome.answers.len(), 2);
        assert_eq!(outcome.answers[0].answer, "First answer.");
        assert_eq!(outcome.answers[1].answer, "Second answer.");

        let debug = outcome.debug.expect("trimmer debug contexts");
        assert_eq!(debug.trimmed_contexts.len(), 2);
        assert_eq!(debug.trimmed_contexts[0].trimmed_context, "reduced context one");
        assert_eq!(debug.trimmed_contexts[1].index, 1);

        // The generation prompts embed the individually reduced contexts.
        let calls = llm.calls();
        assert!(calls[1].0.contains("reduced context one"));
        assert!(calls[3].0.contains("reduced context two"));
    }

    #[tokio::test]
    async fn test_trimmer_echoes_rewritten_fields() {
        let llm = ScriptedGenerator::new(vec![Ok("An answer.")]);
        let long_cv = "c".repeat(2_500);
        let request = request_with(|r| {
            r.enable_text_trimmer = true;
            r.cv_content = long_cv;
            r.question = "Why do you want to join this exchange?".to_string();
        });

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        let echoed = outcome.trimmed_cv.expect("trimmed cv echo");
        assert!(echoed.ends_with("[...Truncated CV...]"));
        let form = outcome.trimmed_form.expect("trimmed form echo");
        assert_eq!(form, "Why do you want to join this exchange?");
    }

    #[tokio::test]
    async fn test_retired_alias_is_normalized_and_persisted() {
        let llm = ScriptedGenerator::new(vec![Ok("Answer.")]);
        let settings = ProviderSettings::new("groq");
        settings.set_api_key(ProviderId::Groq, "gsk_test");
        let request = request_with(|r| {
            r.question = "Why do you apply for this program?".to_string();
            r.model_name = RETIRED_MODEL_ALIAS.to_string();
        });

        run_generation(&llm, &settings, request).await.unwrap();

        // Persisted model is canonical, and the dispatched override too.
        assert_eq!(
            settings.model(ProviderId::Groq).as_deref(),
            Some(RETIRED_MODEL_REPLACEMENT)
        );
        let calls = llm.calls();
        assert_eq!(calls[0].1.as_deref(), Some(RETIRED_MODEL_REPLACEMENT));
    }

    #[tokio::test]
    async fn test_single_question_mode_recovers_labeled_pairs() {
        let llm = ScriptedGenerator::new(vec![Ok(
            "Q1: Why do you apply?\nAnswer: Because I care.\nQ2: What is your goal?\nAnswer: To learn.",
        )]);
        let request = request_with(|r| {
            r.use_question_mode = true;
            r.question = "ignored".to_string();
        });

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        assert_eq!(outcome.answers.len(), 2);
        assert_eq!(outcome.answers[0].question, "Why do you apply?");
        assert_eq!(outcome.answers[1].answer, "To learn.");
    }

    #[tokio::test]
    async fn test_character_limit_formats_every_answer() {
        let llm = ScriptedGenerator::new(vec![
            Ok("1. Answer: one two three four five six.\n2. Answer: seven eight nine ten eleven."),
        ]);
        let request = request_with(|r| {
            r.character_limit = Some(18);
            r.question =
                "Why do you want to join this exchange?\nWhat do you expect to learn there?"
                    .to_string();
        });

        let outcome = run_generation(&llm, &settings(), request).await.unwrap();
        for answer in &outcome.answers {
            assert!(answer.answer.len() <= 21, "answer too long: {}", answer.answer);
            assert!(answer.answer.ends_with("..."));
        }
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let llm = ScriptedGenerator::new(vec![Err("backend down")]);
        let request = request_with(|r| r.question = "Why do you apply today?".to_string());
        let err = run_generation(&llm, &settings(), request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { .. }));
    }
}
