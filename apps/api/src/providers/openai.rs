//! OpenAI chat completions backend adapter.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ChatProvider, ProviderError, ProviderId};
use crate::settings::ProviderSettings;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub struct OpenAiClient {
    client: Client,
    settings: Arc<ProviderSettings>,
}

impl OpenAiClient {
    pub fn new(settings: Arc<ProviderSettings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ProviderError> {
        let api_key = self
            .settings
            .api_key(ProviderId::OpenAi)
            .ok_or(ProviderError::MissingCredential {
                provider: ProviderId::OpenAi,
            })?;

        let model = match model {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_MODEL,
        };

        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.7,
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
            return Err(ProviderError::Upstream {
                provider: ProviderId::OpenAi,
                detail: format!("status {status}: {error_body}"),
            });
        }

        let payload: Value = response.json().await.unwrap_or(Value::Null);
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        Ok(content.to_string())
    }

    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }
}
