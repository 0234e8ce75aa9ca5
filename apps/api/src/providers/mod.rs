//! LLM backends for answer generation.
//!
//! ARCHITECTURAL RULE: no other module may talk to a model HTTP API directly.
//! All model calls go through [`ProviderGateway`], which resolves the
//! configured backend to one of the adapters in this module.

mod gateway;
mod gemini;
mod groq;
mod huggingface;
mod ollama;
mod openai;

pub use gateway::ProviderGateway;
pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use huggingface::{HuggingFaceClient, SYSTEM_SEPARATOR};
pub use ollama::{OllamaClient, OllamaModel};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Backend identifiers exposed to the configuration surface.
/// OpenAI is dispatchable but intentionally not advertised here.
pub const AVAILABLE_PROVIDERS: [ProviderId; 4] = [
    ProviderId::Ollama,
    ProviderId::Groq,
    ProviderId::HuggingFace,
    ProviderId::Gemini,
];

/// Closed set of supported backends. Runtime provider strings resolve into
/// this enum exactly once, at the gateway; everything downstream is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Ollama,
    Groq,
    Gemini,
    HuggingFace,
    OpenAi,
}

impl ProviderId {
    /// Parses a raw configured provider name (trimmed, case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "groq" => Some(Self::Groq),
            "gemini" => Some(Self::Gemini),
            "huggingface" => Some(Self::HuggingFace),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    /// The lowercase key used in settings maps and API payloads.
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::HuggingFace => "huggingface",
            Self::OpenAi => "openai",
        }
    }

    /// Human-facing name for status endpoints and logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::Groq => "Groq",
            Self::Gemini => "Gemini",
            Self::HuggingFace => "HuggingFace",
            Self::OpenAi => "OpenAI",
        }
    }

    /// Local backends need no API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Rewrites deprecated model aliases to the current canonical identifier.
///
/// Invariant: no deprecated alias may ever reach an HTTP call or be stored in
/// settings. Every call site that sets or resolves a model name for the
/// affected backend must pass through here.
pub fn canonical_model(provider: ProviderId, model: &str) -> String {
    let trimmed = model.trim();
    if provider == ProviderId::Groq
        && (trimmed.eq_ignore_ascii_case("llama3:8b")
            || trimmed.eq_ignore_ascii_case("llama3-8b-8192"))
    {
        return groq::DEFAULT_MODEL.to_string();
    }
    trimmed.to_string()
}

/// Errors from backend resolution and dispatch.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown provider '{0}'. Please select a valid provider in the admin panel.")]
    UnknownProvider(String),

    #[error("{provider} API key is missing. Please configure it in the admin panel.")]
    MissingCredential { provider: ProviderId },

    #[error("{provider} request failed: {detail}")]
    Upstream { provider: ProviderId, detail: String },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: ProviderId },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One concrete backend adapter. Each knows its own request/response shape
/// and fetches its own credential from settings, like the configuration
/// collaborator contract prescribes.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends `prompt` to the backend. `model` is the resolved model name;
    /// `None` means the backend's own built-in default.
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<String, ProviderError>;

    fn id(&self) -> ProviderId;
}

/// The capability the pipeline stages depend on: "turn a prompt into text".
/// Implemented by [`ProviderGateway`]; tests substitute scripted generators.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        model_override: Option<&str>,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted generator for pipeline tests: pops one canned result per
    /// call and records every prompt and model override it was sent.
    /// Panics when called more times than it has responses — over-calling
    /// is always a bug in the stage under test.
    pub struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedGenerator {
        pub fn new(responses: Vec<Result<&str, &str>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            prompt: &str,
            model_override: Option<&str>,
        ) -> Result<String, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), model_override.map(str::to_string)));
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(detail)) => Err(ProviderError::Upstream {
                    provider: ProviderId::Ollama,
                    detail,
                }),
                None => panic!("ScriptedGenerator exhausted: unexpected extra call"),
            }
        }
    }
}
