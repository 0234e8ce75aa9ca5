//! Wire types for the generation API.
//!
//! Field names are part of the caller-facing JSON contract and must not
//! change: requests are camelCase, missing fields default to empty/false.

use serde::{Deserialize, Serialize};

/// One full pipeline invocation. Owned by the calling boundary for the
/// duration of the request; the pipeline only rewrites the text fields at
/// the very start when the trimmer is enabled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    pub cv_content: String,
    pub application_type: String,
    pub program_topic: String,
    pub question: String,
    pub question_category: String,
    pub application_content: String,
    pub additional_notes: String,
    pub character_limit: Option<usize>,
    pub language_level: String,
    pub model_name: String,
    pub is_motivation_letter: bool,
    pub use_question_mode: bool,
    pub use_advanced_form_mode: bool,
    pub enable_text_trimmer: bool,
    pub use_context_cache: bool,
}

impl GenerationRequest {
    /// The explicit model override, if one was sent.
    pub fn model_override(&self) -> Option<&str> {
        let trimmed = self.model_name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// One generated answer paired with the question it answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,
}

/// The exact reduced context used for one question, echoed back for
/// debugging when the trimmer is on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimmedContext {
    pub index: usize,
    pub question: String,
    pub trimmed_context: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub trimmed_contexts: Vec<TrimmedContext>,
}

/// Success payload of `POST /api/ai/generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub answers: Vec<AnswerRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimmed_cv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimmed_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimmed_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_from_camel_case() {
        let json = serde_json::json!({
            "cvContent": "My CV",
            "applicationContent": "Project text",
            "useQuestionMode": true,
            "enableTextTrimmer": true,
            "characterLimit": 500
        });
        let request: GenerationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.cv_content, "My CV");
        assert!(request.use_question_mode);
        assert!(request.enable_text_trimmer);
        assert_eq!(request.character_limit, Some(500));
        assert!(!request.is_motivation_letter);
        assert!(request.additional_notes.is_empty());
    }

    #[test]
    fn test_model_override_ignores_whitespace() {
        let request = GenerationRequest {
            model_name: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(request.model_override(), None);

        let request = GenerationRequest {
            model_name: " mixtral-8x7b-32768 ".to_string(),
            ..Default::default()
        };
        assert_eq!(request.model_override(), Some("mixtral-8x7b-32768"));
    }

    #[test]
    fn test_response_omits_absent_trim_echoes() {
        let response = GenerateResponse {
            success: true,
            answers: vec![AnswerRecord {
                question: "Why?".to_string(),
                answer: "Because.".to_string(),
            }],
            trimmed_cv: None,
            trimmed_project: None,
            trimmed_form: None,
            debug: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("trimmedCv").is_none());
        assert_eq!(json["answers"][0]["question"], "Why?");
    }
}
