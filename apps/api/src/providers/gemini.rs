//! Google Gemini backend adapter.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use super::{ChatProvider, ProviderError, ProviderId};
use crate::settings::ProviderSettings;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiClient {
    client: Client,
    settings: Arc<ProviderSettings>,
}

impl GeminiClient {
    pub fn new(settings: Arc<ProviderSettings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ProviderError> {
        let api_key = self
            .settings
            .api_key(ProviderId::Gemini)
            .ok_or(ProviderError::MissingCredential {
                provider: ProviderId::Gemini,
            })?;

        let model = match model {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_MODEL,
        };
        info!("Using model: {model}");

        let url = format!("{API_BASE}/{model}:generateContent?key={api_key}");
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                provider: ProviderId::Gemini,
                detail: format!("status {status}: {error_body}"),
            });
        }

        let payload: Value = response.json().await.unwrap_or(Value::Null);
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        Ok(text.to_string())
    }

    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }
}
