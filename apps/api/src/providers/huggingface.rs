//! HuggingFace router backend adapter (OpenAI-compatible chat endpoint).
//!
//! The prompt assembler inserts a `###SYSTEM_END###` separator between the
//! system role text and the user payload; this adapter splits on it and
//! tunes temperature down for the extraction and strict Q&A modes.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::info;

use super::{ChatProvider, ProviderError, ProviderId};
use crate::settings::ProviderSettings;

const API_URL: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
const MAX_TOKENS: u32 = 2048;

/// Separator between system instructions and user payload in assembled prompts.
pub const SYSTEM_SEPARATOR: &str = "###SYSTEM_END###";

/// Splits an assembled prompt into chat messages and picks a temperature for
/// the detected mode. Prompts without the separator go out as one user message.
fn build_messages(prompt: &str) -> (Vec<Value>, f64) {
    if let Some((system_part, user_part)) = prompt.split_once(SYSTEM_SEPARATOR) {
        let system = system_part.trim();
        let user = user_part.trim();
        if !system.is_empty() && !user.is_empty() {
            let temperature = if system.contains("specialized form data extractor")
                || system.contains("extract ONLY explicit application form questions")
            {
                0.3
            } else if system.contains("Answer each question separately") {
                0.2
            } else {
                0.7
            };
            return (
                vec![
                    json!({"role": "system", "content": system}),
                    json!({"role": "user", "content": user}),
                ],
                temperature,
            );
        }
    }
    (vec![json!({"role": "user", "content": prompt})], 0.7)
}

pub struct HuggingFaceClient {
    client: Client,
    settings: Arc<ProviderSettings>,
}

impl HuggingFaceClient {
    pub fn new(settings: Arc<ProviderSettings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl ChatProvider for HuggingFaceClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ProviderError> {
        let api_key = self
            .settings
            .api_key(ProviderId::HuggingFace)
            .ok_or(ProviderError::MissingCredential {
                provider: ProviderId::HuggingFace,
            })?;

        let model = match model {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_MODEL,
        };

        let (messages, temperature) = build_messages(prompt);
        info!(
            "Using model: {model} ({} chars, temperature {temperature})",
            prompt.len()
        );

        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = match status {
                StatusCode::UNAUTHORIZED => "Invalid API key".to_string(),
                StatusCode::NOT_FOUND => "Model not available on router".to_string(),
                StatusCode::TOO_MANY_REQUESTS => "Rate limit exceeded".to_string(),
                _ => format!("status {status}: {error_body}"),
            };
            return Err(ProviderError::Upstream {
                provider: ProviderId::HuggingFace,
                detail,
            });
        }

        let payload: Value = response.json().await.unwrap_or(Value::Null);
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        Ok(content.to_string())
    }

    fn id(&self) -> ProviderId {
        ProviderId::HuggingFace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_separator_is_single_user_message() {
        let (messages, temperature) = build_messages("Just answer this.");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert!((temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_separator_splits_system_and_user() {
        let prompt = format!("You are helpful.\n{SYSTEM_SEPARATOR}\nWrite an answer.");
        let (messages, _) = build_messages(&prompt);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are helpful.");
        assert_eq!(messages[1]["content"], "Write an answer.");
    }

    #[test]
    fn test_extraction_mode_lowers_temperature() {
        let prompt = format!(
            "You are a specialized form data extractor.\n{SYSTEM_SEPARATOR}\nExtract things."
        );
        let (_, temperature) = build_messages(&prompt);
        assert!((temperature - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_strict_qa_mode_uses_lowest_temperature() {
        let prompt = format!(
            "Answer each question separately.\n{SYSTEM_SEPARATOR}\nQ1: why?"
        );
        let (_, temperature) = build_messages(&prompt);
        assert!((temperature - 0.2).abs() < f64::EPSILON);
    }
}
