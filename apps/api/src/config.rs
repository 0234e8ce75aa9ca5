use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Everything has a sensible local default; API keys are optional and can
/// also be supplied later through the admin endpoints.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Backend selected at startup. Admin calls can switch it at runtime.
    pub default_provider: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    /// Request timeout for the local backend, in seconds. Hosted backends
    /// rely on the HTTP client library defaults.
    pub local_timeout_secs: u64,
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            default_provider: std::env::var("AI_PROVIDER").unwrap_or_else(|_| "ollama".to_string()),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3:8b".to_string()),
            local_timeout_secs: std::env::var("LOCAL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u64>()
                .context("LOCAL_TIMEOUT_SECS must be a number of seconds")?,
            groq_api_key: optional_env("GROQ_API_KEY"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            huggingface_api_key: optional_env("HUGGINGFACE_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            port: 0,
            rust_log: "info".to_string(),
            default_provider: "ollama".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3:8b".to_string(),
            local_timeout_secs: 10,
            groq_api_key: None,
            gemini_api_key: None,
            huggingface_api_key: None,
            openai_api_key: None,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
