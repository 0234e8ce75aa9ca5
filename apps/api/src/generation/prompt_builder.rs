//! Prompt assembly — pure functions from a request (plus optional question
//! list) to the final instruction text.
//!
//! Template precedence: motivation letter > question mode (strict Q/A) >
//! application mode (structured Q/A) > plain single-answer. Every template
//! carries the persona lock, negative constraints, and language rules
//! verbatim. When the trimmer is on, an over-length prompt gets exactly one
//! corrective pass that truncates only the application/project section.

use std::fmt::Write;

use tracing::info;

use super::prompts::{
    BATCH_OUTPUT_FORMAT, LANGUAGE_RULES, NEGATIVE_CONSTRAINTS, PERSONA_LOCK, SHORT_FIELD_RULES,
    SYSTEM_SEPARATOR,
};
use super::reducer::{clean_lines, trim_topic};
use super::truncate_at_boundary;
use crate::models::generation::GenerationRequest;

/// Hard total-length ceiling for assembled prompts in trimmer mode.
pub const PROMPT_CEILING: usize = 6_000;
const TRUNCATION_SAFETY_MARGIN: usize = 100;

const SECTION_BAR: &str = "==========================================";

const FALLBACK_APPLICATION_TYPE: &str = "international mobility or training program";
const FALLBACK_PROGRAM_TOPIC: &str = "the selected program";
const FALLBACK_LANGUAGE_LEVEL: &str = "Write in clear and simple English";

fn section_header(out: &mut String, title: &str) {
    let _ = writeln!(out, "{SECTION_BAR}\n{title}\n{SECTION_BAR}");
}

/// Language level: explicit hint wins, otherwise inferred from CEFR marks in
/// the CV, otherwise plain English.
pub fn infer_language_level(explicit: &str, cv: &str) -> String {
    if !explicit.trim().is_empty() {
        return explicit.trim().to_string();
    }
    if cv.contains("B2") || cv.contains("C1") || cv.contains("C2") {
        return "Write in professional English".to_string();
    }
    if cv.contains("B1") {
        return "Write in intermediate English".to_string();
    }
    FALLBACK_LANGUAGE_LEVEL.to_string()
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Measures once, truncates only the application/project section by the
/// minimal amount, then assembles once more. One corrective pass is enough
/// in the observed size ranges; this is a fixed-point step, not a loop.
fn apply_length_ceiling<F>(trimmer_enabled: bool, app_content: &str, build: F) -> String
where
    F: Fn(&str) -> String,
{
    let prompt = build(app_content);

    if !trimmer_enabled {
        return prompt;
    }

    let prompt = if prompt.len() > PROMPT_CEILING {
        let excess = prompt.len() - PROMPT_CEILING;
        let new_len = app_content
            .len()
            .saturating_sub(excess + TRUNCATION_SAFETY_MARGIN);
        let truncated = if new_len > 0 {
            format!(
                "{}\n[...Truncated...]",
                truncate_at_boundary(app_content, new_len)
            )
        } else {
            "[Project info truncated due to length limit]".to_string()
        };
        build(&truncated)
    } else {
        prompt
    };

    info!("estimated prompt size: {} tokens", prompt.len() / 4);
    prompt
}

/// Selects the template for a request without an explicit question list.
pub fn build_prompt(request: &GenerationRequest) -> String {
    if !request.application_content.trim().is_empty() {
        return build_application_prompt(request);
    }
    build_single_prompt(request)
}

/// Plain single-answer template: one question, one answer, CV as evidence.
fn build_single_prompt(request: &GenerationRequest) -> String {
    if request.cv_content.trim().is_empty() && request.question.trim().is_empty() {
        return "Please provide CV content and a question.".to_string();
    }

    let mut p = String::new();
    p.push_str(PERSONA_LOCK);
    p.push('\n');
    p.push_str(NEGATIVE_CONSTRAINTS);
    p.push('\n');
    p.push_str(LANGUAGE_RULES);
    p.push('\n');
    p.push_str("Question handling rules:\n");
    p.push_str("- Treat ONLY explicit form questions as questions.\n");
    p.push_str("- Only include lines ending with '?' and containing at least 5 words.\n");
    p.push_str("- Ignore navigation text, legal text, website footer, duplicated content, bilingual duplicates, and generic instructions.\n\n");

    section_header(&mut p, "               CONTEXT");
    let _ = writeln!(
        p,
        "- Application Type: {}",
        or_fallback(&request.application_type, FALLBACK_APPLICATION_TYPE)
    );
    let _ = writeln!(
        p,
        "- Program Topic: {}",
        or_fallback(&request.program_topic, FALLBACK_PROGRAM_TOPIC)
    );
    let _ = writeln!(
        p,
        "- Language Level: {}\n",
        infer_language_level(&request.language_level, &request.cv_content)
    );

    section_header(&mut p, "             THE QUESTION");
    if !request.question_category.trim().is_empty() {
        let _ = writeln!(p, "Category: {}", request.question_category);
    }
    let _ = writeln!(p, "Question: {}\n", request.question);

    section_header(&mut p, "          APPLICANT PROFILE (CV)");
    let _ = writeln!(p, "{}\n", request.cv_content);

    section_header(&mut p, "             INSTRUCTIONS");
    p.push_str("1. Relevance: Use specific details from the CV that relate directly to the question and program topic.\n");
    p.push_str("2. Tone: Professional, enthusiastic, and confident.\n");
    p.push_str("3. Structure: Clear, coherent, and well-structured paragraphs.\n");
    p.push_str("4. Specificity: Avoid generic statements like 'I am a hard worker'. Provide evidence from the CV instead.\n");
    p.push_str("5. Factuality: Do NOT invent facts. Only use information provided in the CV or reasonable inferences.\n");
    if let Some(limit) = request.character_limit.filter(|l| *l > 0) {
        let _ = writeln!(
            p,
            "6. Length: STRICTLY limit your answer to approximately {limit} characters."
        );
    }
    if !request.additional_notes.trim().is_empty() {
        let _ = writeln!(p, "7. Additional Notes: {}", request.additional_notes);
    }

    p.push('\n');
    section_header(&mut p, "            YOUR ANSWER:");
    p
}

/// Application-mode templates: motivation letter, strict Q/A extraction, or
/// structured Q/A over the whole application text. These carry a system/user
/// separator so chat backends can split roles.
fn build_application_prompt(request: &GenerationRequest) -> String {
    let app_content = if request.enable_text_trimmer {
        clean_lines(&request.application_content)
    } else {
        request.application_content.clone()
    };

    let build = |app: &str| -> String {
        let mut p = String::new();
        p.push_str(PERSONA_LOCK);
        p.push('\n');
        p.push_str(NEGATIVE_CONSTRAINTS);
        p.push('\n');
        p.push_str(LANGUAGE_RULES);
        p.push('\n');
        p.push_str(SHORT_FIELD_RULES);
        p.push('\n');

        if request.is_motivation_letter {
            p.push_str("You are a professional applicant applying for an international mobility program, internship, or job.\n");
            p.push_str("Your task is to write a highly professional, structured, and convincing Motivation Letter.\n");
        } else if request.use_question_mode {
            p.push_str("You are a specialized form data extractor.\n");
            p.push_str("Your task is to analyze the content, extract ONLY explicit application form questions, and provide professional answers.\n");
            p.push_str("Ignore navigation, legal text, footers, and repeated sections.\n");
        } else {
            p.push_str("You are filling out an application form.\n");
            p.push_str("Answer each extracted question.\n");
            p.push_str("Rules:\n");
            p.push_str("- No introduction\n- No explanation\n- No commentary\n- No rewriting CV\n- No improvements\n- Only answer questions\n\n");
            p.push_str("Format strictly:\nQ1: {question}\nAnswer:\n{answer}\n\nRepeat for all questions.\n");
        }

        let _ = writeln!(p, "\n{SYSTEM_SEPARATOR}\n");

        section_header(&mut p, "               CV SECTION");
        let _ = writeln!(p, "{}\n", request.cv_content);

        section_header(&mut p, "           APPLICATION SECTION");
        let _ = writeln!(p, "{app}\n");

        if !request.additional_notes.trim().is_empty() {
            section_header(&mut p, "                 NOTES");
            let _ = writeln!(p, "{}\n", request.additional_notes);
        }

        section_header(&mut p, "             INSTRUCTIONS");
        if request.is_motivation_letter {
            p.push_str("1. Structure: Introduction, Body Paragraphs (Experience, Skills, Alignment), Conclusion.\n");
            p.push_str("2. Tone: Enthusiastic, professional, and polite.\n");
            p.push_str("3. Alignment: Explicitly connect the applicant's CV details to the Application/Project details.\n");
            p.push_str("4. No Hallucination: Do not invent facts not present in the CV.\n");
        } else if request.use_question_mode {
            p.push_str("Answer each question separately.\n");
            p.push_str("Rules:\n");
            p.push_str("- Do NOT merge answers.\n- Do NOT generate essay style text.\n- Do NOT add introduction.\n- Do NOT add conclusion.\n- Do NOT comment.\n- Answer directly and concisely.\n\n");
            p.push_str("Output format:\nQ1: {question}\nAnswer:\n{answer}\n\nQ2: {question}\nAnswer:\n{answer}\nRepeat until finished.\n");
        } else if !request.question.trim().is_empty() {
            let _ = writeln!(p, "Specific Question to Answer: {}", request.question);
            p.push_str("1. Answer ONLY this question.\n");
            p.push_str("2. Use the CV and Application info to provide evidence.\n");
        } else {
            p.push_str("1. Identify the key questions or requirements in the Application Section.\n");
            p.push_str("2. Provide structured answers or a comprehensive application text.\n");
            p.push_str("3. Constraint: Never split by question numbers like 'Q1'. Return a single integrated text.\n");
        }

        p.push('\n');
        section_header(&mut p, "            YOUR RESPONSE:");
        p
    };

    apply_length_ceiling(request.enable_text_trimmer, &app_content, build)
}

/// Batch template: enumerates every question 1-based and demands the
/// matching `{n}. Answer:` response structure.
pub fn build_batch_prompt(request: &GenerationRequest, questions: &[String]) -> String {
    let (program_topic, app_content) = if request.enable_text_trimmer {
        (
            trim_topic(&request.program_topic),
            clean_lines(&request.application_content),
        )
    } else {
        (
            request.program_topic.clone(),
            request.application_content.clone(),
        )
    };

    let build = |app: &str| -> String {
        let mut p = String::new();
        p.push_str(PERSONA_LOCK);
        p.push('\n');
        p.push_str(NEGATIVE_CONSTRAINTS);
        p.push('\n');
        p.push_str(LANGUAGE_RULES);
        p.push('\n');
        p.push_str(BATCH_OUTPUT_FORMAT);
        p.push('\n');

        p.push_str("CONTEXT:\n");
        let _ = writeln!(
            p,
            "- Application Type: {}",
            or_fallback(&request.application_type, FALLBACK_APPLICATION_TYPE)
        );
        let _ = writeln!(
            p,
            "- Program Topic: {}",
            or_fallback(&program_topic, FALLBACK_PROGRAM_TOPIC)
        );
        let _ = writeln!(
            p,
            "- Language Level: {}\n",
            or_fallback(&request.language_level, FALLBACK_LANGUAGE_LEVEL)
        );

        if !app.trim().is_empty() {
            let _ = writeln!(p, "PROJECT / APPLICATION INFO:\n{app}\n");
        }

        let _ = writeln!(p, "APPLICANT CV:\n{}\n", request.cv_content);

        if !request.additional_notes.trim().is_empty() {
            let _ = writeln!(p, "ADDITIONAL NOTES:\n{}\n", request.additional_notes);
        }

        p.push_str("QUESTIONS:\n");
        for (i, question) in questions.iter().enumerate() {
            let _ = writeln!(p, "{}. {}", i + 1, question);
        }
        p.push_str("\nANSWERS:\n");
        p
    };

    apply_length_ceiling(request.enable_text_trimmer, &app_content, build)
}
