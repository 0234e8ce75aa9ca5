pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route("/api/ai/generate", post(handlers::handle_generate))
        .route("/api/ai/chat", post(handlers::handle_chat))
        .route("/api/ai/provider-test", get(handlers::handle_provider_test))
        // Provider configuration API
        .route("/api/ai/providers", get(handlers::handle_providers))
        .route("/api/ai/models", get(handlers::handle_models))
        .route(
            "/api/ai/provider-status",
            get(handlers::handle_provider_status),
        )
        .route("/api/ai/model-status", get(handlers::handle_model_status))
        .route("/api/ai/set-model", post(handlers::handle_set_model))
        .route("/api/ai/set-provider", post(handlers::handle_set_provider))
        .route("/api/ai/set-api-key", post(handlers::handle_set_api_key))
        .with_state(state)
}
