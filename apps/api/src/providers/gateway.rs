//! ProviderGateway — resolves the configured backend and model, then
//! dispatches. The backend is the settings' current provider only; there is
//! no per-request backend override. Model resolution order: explicit
//! override → persisted per-provider default → backend built-in default.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::{
    canonical_model, ChatProvider, GeminiClient, GroqClient, HuggingFaceClient, OllamaClient,
    OllamaModel, OpenAiClient, ProviderError, ProviderId, TextGenerator,
};
use crate::config::Config;
use crate::settings::ProviderSettings;

pub struct ProviderGateway {
    settings: Arc<ProviderSettings>,
    ollama: OllamaClient,
    groq: GroqClient,
    gemini: GeminiClient,
    huggingface: HuggingFaceClient,
    openai: OpenAiClient,
}

impl ProviderGateway {
    pub fn new(config: &Config, settings: Arc<ProviderSettings>) -> Self {
        Self {
            ollama: OllamaClient::new(
                &config.ollama_base_url,
                &config.ollama_model,
                Duration::from_secs(config.local_timeout_secs),
            ),
            groq: GroqClient::new(Arc::clone(&settings)),
            gemini: GeminiClient::new(Arc::clone(&settings)),
            huggingface: HuggingFaceClient::new(Arc::clone(&settings)),
            openai: OpenAiClient::new(Arc::clone(&settings)),
            settings,
        }
    }

    fn client(&self, id: ProviderId) -> &dyn ChatProvider {
        match id {
            ProviderId::Ollama => &self.ollama,
            ProviderId::Groq => &self.groq,
            ProviderId::Gemini => &self.gemini,
            ProviderId::HuggingFace => &self.huggingface,
            ProviderId::OpenAi => &self.openai,
        }
    }

    /// Resolves the effective model for a backend without dispatching.
    /// Used by the status endpoints as well, so alias normalization is
    /// applied on every read path, not only at call time.
    pub fn resolve_model(&self, id: ProviderId, model_override: Option<&str>) -> Option<String> {
        let picked = match model_override {
            Some(m) if !m.trim().is_empty() => Some(m.to_string()),
            _ => self.settings.model(id),
        };
        picked.map(|m| canonical_model(id, &m))
    }

    /// Lists models installed on the local backend.
    pub async fn list_local_models(&self) -> Vec<OllamaModel> {
        self.ollama.list_models().await
    }
}

#[async_trait]
impl TextGenerator for ProviderGateway {
    async fn generate(
        &self,
        prompt: &str,
        model_override: Option<&str>,
    ) -> Result<String, ProviderError> {
        let configured = self.settings.current_provider();
        let id = ProviderId::parse(&configured)
            .ok_or_else(|| ProviderError::UnknownProvider(configured.clone()))?;
        let client = self.client(id);
        info!("Using provider: {}", client.id());

        let model = self.resolve_model(id, model_override);
        info!("Using model: {}", model.as_deref().unwrap_or("(default)"));

        client.generate(prompt, model.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_with_provider(provider: &str) -> ProviderGateway {
        let config = Config::for_tests();
        let settings = Arc::new(ProviderSettings::new(provider));
        ProviderGateway::new(&config, settings)
    }

    #[tokio::test]
    async fn test_unknown_provider_does_not_dispatch() {
        let gateway = gateway_with_provider("bedrock");
        let err = gateway.generate("hello", None).await.unwrap_err();
        match err {
            ProviderError::UnknownProvider(name) => assert_eq!(name, "bedrock"),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hosted_backend_without_key_is_rejected() {
        let gateway = gateway_with_provider("groq");
        let err = gateway.generate("hello", None).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredential {
                provider: ProviderId::Groq
            }
        ));
    }

    #[test]
    fn test_resolve_model_prefers_override_over_persisted() {
        let gateway = gateway_with_provider("groq");
        gateway
            .settings
            .set_model(ProviderId::Groq, "mixtral-8x7b-32768");
        let resolved = gateway.resolve_model(ProviderId::Groq, Some("llama-3.1-70b-versatile"));
        assert_eq!(resolved.as_deref(), Some("llama-3.1-70b-versatile"));
    }

    #[test]
    fn test_resolve_model_falls_back_to_persisted_default() {
        let gateway = gateway_with_provider("groq");
        gateway
            .settings
            .set_model(ProviderId::Groq, "mixtral-8x7b-32768");
        let resolved = gateway.resolve_model(ProviderId::Groq, Some("   "));
        assert_eq!(resolved.as_deref(), Some("mixtral-8x7b-32768"));
    }

    #[test]
    fn test_resolve_model_canonicalizes_override_alias() {
        // An alias arriving via explicit request override must still come out
        // canonical: no deprecated identifier may reach an HTTP call.
        let gateway = gateway_with_provider("groq");
        let resolved = gateway.resolve_model(ProviderId::Groq, Some("llama3-8b-8192"));
        assert_eq!(resolved.as_deref(), Some("llama-3.1-8b-instant"));
    }
}
