//! Local Ollama backend adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, ProviderError, ProviderId};

#[cfg_attr(not(test), allow(dead_code))]
const DEFAULT_BASE_URL: &str = "http://localhost:11434";
#[cfg_attr(not(test), allow(dead_code))]
const DEFAULT_MODEL: &str = "llama3:8b";

/// Local inference needs no key but can be slow; requests carry an explicit
/// seconds-scale timeout instead of relying on client defaults.
const MODEL_LIST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

/// Model entry returned by the models endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaModel {
    pub id: String,
    pub name: String,
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
    default_model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, default_model: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build Ollama HTTP client"),
            // Avoid double slashes when joining paths.
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: default_model.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL, Duration::from_secs(10))
    }

    /// Lists locally installed models via `/api/tags`. Returns an empty list
    /// on any failure — the models endpoint is advisory, not critical.
    pub async fn list_models(&self) -> Vec<OllamaModel> {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self
            .client
            .get(&url)
            .timeout(MODEL_LIST_TIMEOUT)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            _ => return Vec::new(),
        };

        match response.json::<TagsResponse>().await {
            Ok(tags) => tags
                .models
                .into_iter()
                .filter(|m| !m.name.trim().is_empty())
                .map(|m| OllamaModel {
                    id: m.name.clone(),
                    name: m.name,
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ChatProvider for OllamaClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ProviderError> {
        let model = match model {
            Some(m) if !m.is_empty() => m,
            _ => self.default_model.as_str(),
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                provider: ProviderId::Ollama,
                detail: format!("status {status}: {body}"),
            });
        }

        // A 2xx with a missing or empty `response` field is fatal for the
        // local backend: there is nothing to degrade to.
        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|_| ProviderError::EmptyResponse {
                    provider: ProviderId::Ollama,
                })?;

        match parsed.response {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(ProviderError::EmptyResponse {
                provider: ProviderId::Ollama,
            }),
        }
    }

    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }
}
