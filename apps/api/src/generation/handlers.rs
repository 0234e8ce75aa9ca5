//! Axum route handlers for the AI generation and provider-configuration API.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::pipeline::{generate_text, run_generation};
use crate::errors::AppError;
use crate::models::generation::{ChatRequest, GenerateResponse, GenerationRequest};
use crate::providers::{ProviderId, AVAILABLE_PROVIDERS};
use crate::state::AppState;

/// Admission control: raw payloads over this are rejected before the
/// pipeline runs at all.
const MAX_PAYLOAD_BYTES: usize = 20_480;

/// Static Groq catalog; the local backend is queried live instead.
const GROQ_MODELS: [(&str, &str); 3] = [
    ("llama-3.1-8b-instant", "Llama 3.1 8B Instant"),
    ("llama-3.1-70b-versatile", "Llama 3.1 70B Versatile"),
    ("mixtral-8x7b-32768", "Mixtral 8x7B"),
];

// ────────────────────────────────────────────────────────────────────────────
// Generation
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/ai/generate
///
/// The full pipeline. Body is taken raw so the size guard runs before JSON
/// parsing or any model call.
pub async fn handle_generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, AppError> {
    if body.len() > MAX_PAYLOAD_BYTES {
        return Err(AppError::ContentTooLarge);
    }

    let request: GenerationRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;

    info!(
        "generate: provider={} question_mode={} trimmer={}",
        state.settings.current_provider(),
        request.use_question_mode,
        request.enable_text_trimmer
    );

    let outcome = run_generation(state.gateway.as_ref(), &state.settings, request).await?;

    Ok(Json(GenerateResponse {
        success: true,
        answers: outcome.answers,
        trimmed_cv: outcome.trimmed_cv,
        trimmed_project: outcome.trimmed_project,
        trimmed_form: outcome.trimmed_form,
        debug: outcome.debug,
    }))
}

/// POST /api/ai/chat
///
/// Plain passthrough generation with a response-time echo.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::Validation("Message cannot be empty.".to_string()));
    }

    let started = Instant::now();
    let response = generate_text(state.gateway.as_ref(), &request.message, None).await?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    info!("chat response in {elapsed_ms} ms");

    Ok(Json(json!({
        "success": true,
        "response": response,
        "responseTimeMs": elapsed_ms,
        "durationMs": elapsed_ms,
    })))
}

/// GET /api/ai/provider-test
///
/// One tiny generation to verify backend connectivity.
pub async fn handle_provider_test(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let response = generate_text(state.gateway.as_ref(), "Say hello", None).await?;
    if response.is_empty() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "Empty response from provider"
        )));
    }
    Ok(Json(json!({ "success": true })))
}

// ────────────────────────────────────────────────────────────────────────────
// Provider configuration surface
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetModelRequest {
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetProviderRequest {
    pub provider: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetApiKeyRequest {
    pub provider: String,
    pub api_key: String,
}

/// GET /api/ai/providers
pub async fn handle_providers() -> Json<Value> {
    let ids: Vec<&str> = AVAILABLE_PROVIDERS.iter().map(|p| p.as_key()).collect();
    Json(json!(ids))
}

/// GET /api/ai/models?provider=
///
/// Groq has a static catalog; anything else lists the local backend's
/// installed models (empty on failure — advisory only).
pub async fn handle_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Json<Value> {
    let effective = query
        .provider
        .unwrap_or_else(|| state.settings.current_provider());

    if ProviderId::parse(&effective) == Some(ProviderId::Groq) {
        let models: Vec<Value> = GROQ_MODELS
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        return Json(json!(models));
    }

    let models = state.gateway.list_local_models().await;
    Json(json!(models))
}

/// GET /api/ai/provider-status
pub async fn handle_provider_status(State(state): State<AppState>) -> Json<Value> {
    let raw = state.settings.current_provider();
    let id = ProviderId::parse(&raw);

    let provider = id.map_or("Unknown", |p| p.display_name());
    let model = id
        .and_then(|p| state.gateway.resolve_model(p, None))
        .unwrap_or_else(|| "Unknown".to_string());
    let api_key_configured = id.is_some_and(|p| state.settings.api_key_configured(p));

    info!("provider status: {provider} | {model} | key configured: {api_key_configured}");

    Json(json!({
        "status": "OK",
        "provider": provider,
        "model": model,
        "apiKeyConfigured": api_key_configured,
    }))
}

/// GET /api/ai/model-status
pub async fn handle_model_status(State(state): State<AppState>) -> Json<Value> {
    let raw = state.settings.current_provider();
    let id = ProviderId::parse(&raw);

    let provider = id.map_or("Unknown", |p| p.display_name());
    let model = id
        .and_then(|p| state.gateway.resolve_model(p, None))
        .unwrap_or_else(|| "Unknown".to_string());

    Json(json!({ "status": "OK", "provider": provider, "model": model }))
}

/// POST /api/ai/set-model
///
/// Stores the last-used model for the active backend. Deprecated aliases are
/// canonicalized on the way in; a blank model just reads back the current one.
pub async fn handle_set_model(
    State(state): State<AppState>,
    Json(request): Json<SetModelRequest>,
) -> Json<Value> {
    let raw = state.settings.current_provider();
    let id = ProviderId::parse(&raw);
    let provider = id.map_or("Unknown", |p| p.display_name());

    let requested = request.model.unwrap_or_default();
    let requested = requested.trim();

    let model = match (id, requested.is_empty()) {
        (Some(p), false) => {
            state.settings.set_model(p, requested);
            let stored = state
                .settings
                .model(p)
                .unwrap_or_else(|| requested.to_string());
            info!("model set: {provider} / {stored}");
            stored
        }
        (Some(p), true) => state
            .settings
            .model(p)
            .unwrap_or_else(|| "Unknown".to_string()),
        (None, _) => "Unknown".to_string(),
    };

    Json(json!({ "status": "OK", "provider": provider, "model": model }))
}

/// POST /api/ai/set-provider
pub async fn handle_set_provider(
    State(state): State<AppState>,
    Json(request): Json<SetProviderRequest>,
) -> Result<Json<Value>, AppError> {
    let id = ProviderId::parse(&request.provider).ok_or_else(|| {
        AppError::Validation(format!("Unknown provider '{}'", request.provider))
    })?;

    state.settings.set_provider(id.as_key());
    info!("provider set: {}", id.display_name());

    Ok(Json(json!({ "status": "OK", "provider": id.display_name() })))
}

/// POST /api/ai/set-api-key
///
/// In-memory only; at-rest encryption and persistence are an external concern.
pub async fn handle_set_api_key(
    State(state): State<AppState>,
    Json(request): Json<SetApiKeyRequest>,
) -> Result<Json<Value>, AppError> {
    let id = ProviderId::parse(&request.provider).ok_or_else(|| {
        AppError::Validation(format!("Unknown provider '{}'", request.provider))
    })?;

    if request.api_key.trim().is_empty() {
        return Err(AppError::Validation("API key cannot be empty.".to_string()));
    }

    state.settings.set_api_key(id, &request.api_key);
    info!("api key configured for {}", id.display_name());

    Ok(Json(json!({ "status": "OK", "provider": id.display_name() })))
}
