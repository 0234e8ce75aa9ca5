//! Groq hosted chat backend adapter.
//!
//! Carries the deprecated-model auto-fallback: when Groq reports the
//! requested model as decommissioned or unknown, the call is retried exactly
//! once against the known-good default. Both error bodies are surfaced
//! together if the retry fails too.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ChatProvider, ProviderError, ProviderId};
use crate::settings::ProviderSettings;

const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Models Groq currently serves. Anything else is forced back to the default
/// before dispatch rather than burning a request on a guaranteed rejection.
const ALLOWED_MODELS: [&str; 3] = [
    "llama-3.1-8b-instant",
    "llama-3.1-70b-versatile",
    "mixtral-8x7b-32768",
];

/// Substrings Groq puts in error bodies for retired or unknown models.
const DECOMMISSION_MARKERS: [&str; 2] = ["model_decommissioned", "model_not_found"];

pub fn is_decommissioned_model_error(body: &str) -> bool {
    DECOMMISSION_MARKERS.iter().any(|m| body.contains(m))
}

fn validated_model(model: Option<&str>) -> &str {
    match model {
        Some(m) if ALLOWED_MODELS.contains(&m) => m,
        _ => DEFAULT_MODEL,
    }
}

pub struct GroqClient {
    client: Client,
    settings: Arc<ProviderSettings>,
}

impl GroqClient {
    pub fn new(settings: Arc<ProviderSettings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    async fn send(&self, api_key: &str, model: &str, prompt: &str) -> Result<reqwest::Response, ProviderError> {
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.7,
        });
        Ok(self
            .client
            .post(API_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?)
    }
}

#[async_trait]
impl ChatProvider for GroqClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ProviderError> {
        let api_key = self
            .settings
            .api_key(ProviderId::Groq)
            .ok_or(ProviderError::MissingCredential {
                provider: ProviderId::Groq,
            })?;

        let model = validated_model(model);
        info!("Groq model validated: {model}");

        let mut response = self.send(&api_key, model, prompt).await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();

            if is_decommissioned_model_error(&error_body) {
                warn!("Groq model '{model}' deprecated or not found, falling back to {DEFAULT_MODEL}");
                response = self.send(&api_key, DEFAULT_MODEL, prompt).await?;

                if !response.status().is_success() {
                    let fallback_status = response.status();
                    let fallback_body = response.text().await.unwrap_or_default();
                    return Err(ProviderError::Upstream {
                        provider: ProviderId::Groq,
                        detail: format!(
                            "fallback failed. Original ({status}): {error_body} | Fallback ({fallback_status}): {fallback_body}"
                        ),
                    });
                }
            } else {
                return Err(ProviderError::Upstream {
                    provider: ProviderId::Groq,
                    detail: format!("status {status}: {error_body}"),
                });
            }
        }

        let payload: Value = response.json().await.unwrap_or(Value::Null);
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        Ok(content.to_string())
    }

    fn id(&self) -> ProviderId {
        ProviderId::Groq
    }
}
